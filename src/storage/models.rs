use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Teachers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeacherStatus {
    Active,
    Blocked,
}

impl TeacherStatus {
    pub fn toggled(self) -> Self {
        match self {
            TeacherStatus::Active => TeacherStatus::Blocked,
            TeacherStatus::Blocked => TeacherStatus::Active,
        }
    }
}

/// A registered teacher. `teacher_id` is the institution-issued id chosen at signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub teacher_id: String,
    pub name: String,
    pub email: String,
    /// PBKDF2-HMAC-SHA256 in `pbkdf2$<iterations>$<salt>$<hash>` form
    pub password_hash: String,
    pub department: String,
    pub subject: String,
    pub status: TeacherStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Departments and students
// ============================================================================

/// A department with its subjects grouped by year label (e.g. "2nd Year").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub years: BTreeMap<String, Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Department {
    pub fn has_subject(&self, year: &str, subject: &str) -> bool {
        self.years
            .get(year)
            .is_some_and(|subjects| subjects.iter().any(|s| s == subject))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub year: String,
    #[serde(default)]
    pub teacher_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Exams
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    /// Answer sheets are still being evaluated
    Active,
    /// Every submission is evaluated; awaiting the controller
    Submitted,
    /// Results are published
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Evaluated,
}

/// The outcome of evaluating one answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub marks: f64,
    pub out_of: f64,
    #[serde(default)]
    pub comments: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// A student's answer sheet, embedded in its exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub answer_sheet_id: String,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
}

impl Submission {
    pub fn is_evaluated(&self) -> bool {
        self.status == SubmissionStatus::Evaluated
    }

    pub fn marks(&self) -> Option<f64> {
        self.evaluation.as_ref().map(|e| e.marks)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub department: String,
    pub year: String,
    pub subject: String,
    pub question_paper_id: String,
    pub answer_key_id: String,
    #[serde(default)]
    pub total_marks: Option<f64>,
    pub status: ExamStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub submissions: Vec<Submission>,
}

impl Exam {
    pub fn submission(&self, student_id: &str) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.student_id == student_id)
    }

    pub fn evaluated_count(&self) -> usize {
        self.submissions.iter().filter(|s| s.is_evaluated()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.submissions.len() - self.evaluated_count()
    }

    /// Every answer sheet has been evaluated (and there is at least one).
    pub fn is_eligible_for_publication(&self) -> bool {
        !self.submissions.is_empty() && self.submissions.iter().all(Submission::is_evaluated)
    }

    /// Ids of every document this exam owns.
    pub fn document_ids(&self) -> Vec<String> {
        let mut ids = vec![self.question_paper_id.clone(), self.answer_key_id.clone()];
        ids.extend(self.submissions.iter().map(|s| s.answer_sheet_id.clone()));
        ids
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    All,
    Specific,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub teacher_id: String,
    pub name: String,
}

/// A controller notification. Inbox copies carry the recipient's id and name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub audience: Audience,
    pub recipients: Vec<Recipient>,
    pub sender: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub read_by: Vec<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
}

impl Notification {
    pub fn is_read_by(&self, teacher_id: &str) -> bool {
        self.read_by.iter().any(|id| id == teacher_id)
    }

    /// Returns false when the teacher had already read it.
    pub fn mark_read_by(&mut self, teacher_id: &str) -> bool {
        if self.is_read_by(teacher_id) {
            return false;
        }
        self.read_by.push(teacher_id.to_string());
        true
    }
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    QuestionPaper,
    AnswerKey,
    AnswerSheet,
    Attachment,
}

impl DocumentKind {
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::QuestionPaper => "question paper",
            DocumentKind::AnswerKey => "answer key",
            DocumentKind::AnswerSheet => "answer sheet",
            DocumentKind::Attachment => "attachment",
        }
    }
}

/// Metadata for an uploaded file; the bytes live in the object store under `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub kind: DocumentKind,
    pub mime_type: String,
    pub byte_size: u64,
    #[serde(default)]
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Replicated writes
// ============================================================================

/// Types of write operations (replicated via muster)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WriteOp {
    CreateTeacher(Teacher),
    SetTeacherStatus {
        teacher_id: String,
        status: TeacherStatus,
    },
    DeleteTeacher {
        teacher_id: String,
    },
    UpsertDepartment(Department),
    DeleteDepartment {
        id: String,
    },
    ClearDepartments,
    CreateStudent(Student),
    UpdateStudent(Student),
    DeleteStudent {
        id: String,
    },
    CreateExam {
        exam: Exam,
        documents: Vec<DocumentRecord>,
    },
    RecordEvaluation {
        exam_id: String,
        student_id: String,
        evaluation: Evaluation,
    },
    DeleteExam {
        id: String,
    },
    PublishResults {
        exam_id: String,
        published_at: DateTime<Utc>,
    },
    UnpublishResults {
        exam_id: String,
    },
    SendNotification(Notification),
    MarkNotificationsRead {
        teacher_id: String,
        /// `None` marks the whole inbox
        #[serde(default)]
        notification_ids: Option<Vec<String>>,
    },
    DeleteNotification {
        id: String,
    },
    CreateDocument(DocumentRecord),
    DeleteDocument {
        id: String,
    },
}
