use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::documents::prepare_data_url;
use super::{matches_filter, required, ServiceError, ServiceResult};
use crate::grading::MarkSheet;
use crate::storage::models::{
    DocumentKind, DocumentRecord, Evaluation, Exam, ExamStatus, Submission, SubmissionStatus,
    WriteOp,
};
use crate::storage::Database;

/// Where a document referenced by an exam comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentSource {
    /// Previously uploaded through `POST /documents`
    Existing { document_id: String },
    /// Embedded as a base64 data URL
    Inline {
        data_url: String,
        #[serde(default)]
        file_name: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentSheet {
    #[serde(default)]
    pub student_id: String,
    pub answer_sheet: Option<DocumentSource>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateExamRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub question_paper: Option<DocumentSource>,
    #[serde(default)]
    pub answer_key: Option<DocumentSource>,
    #[serde(default)]
    pub students: Vec<StudentSheet>,
}

/// A validated exam plus the document bytes that must reach the object store
/// before the exam is replicated.
#[derive(Debug)]
pub struct PreparedExam {
    pub exam: Exam,
    pub documents: Vec<DocumentRecord>,
    pub uploads: Vec<(String, Bytes)>,
}

impl PreparedExam {
    pub fn into_write_op(self) -> (WriteOp, Vec<(String, Bytes)>) {
        (
            WriteOp::CreateExam {
                exam: self.exam,
                documents: self.documents,
            },
            self.uploads,
        )
    }
}

/// A validated evaluation for one submission.
#[derive(Debug, Clone)]
pub struct PreparedEvaluation {
    pub exam_id: String,
    pub student_id: String,
    pub evaluation: Evaluation,
}

impl PreparedEvaluation {
    pub fn write_op(&self) -> WriteOp {
        WriteOp::RecordEvaluation {
            exam_id: self.exam_id.clone(),
            student_id: self.student_id.clone(),
            evaluation: self.evaluation.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub mark_sheet: MarkSheet,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExamFilter {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<ExamStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationProgress {
    pub exam_id: String,
    pub total: usize,
    pub evaluated: usize,
    pub pending: usize,
    pub eligible_for_publication: bool,
}

impl From<&Exam> for EvaluationProgress {
    fn from(exam: &Exam) -> Self {
        Self {
            exam_id: exam.id.clone(),
            total: exam.submissions.len(),
            evaluated: exam.evaluated_count(),
            pending: exam.pending_count(),
            eligible_for_publication: exam.is_eligible_for_publication(),
        }
    }
}

/// Collects the documents an exam refers to while it is being validated.
struct DocumentPlan<'a> {
    db: &'a Database,
    max_upload_size: u64,
    /// Title of the exam each already attached document belongs to
    in_use: HashMap<String, String>,
    title: &'a str,
    documents: Vec<DocumentRecord>,
    uploads: Vec<(String, Bytes)>,
}

impl DocumentPlan<'_> {
    fn resolve(
        &mut self,
        source: Option<&DocumentSource>,
        kind: DocumentKind,
        missing: &str,
    ) -> ServiceResult<String> {
        match source {
            None => Err(ServiceError::Invalid(missing.to_string())),
            Some(DocumentSource::Existing { document_id }) => {
                let document = self.db.get_document(document_id)?.ok_or_else(|| {
                    ServiceError::Invalid(format!("Document '{document_id}' does not exist"))
                })?;
                if document.kind != kind {
                    return Err(ServiceError::Invalid(format!(
                        "Document '{document_id}' is not a valid {} (uploaded as {})",
                        kind.label(),
                        document.kind.label()
                    )));
                }
                if let Some(title) = self.in_use.get(&document.id) {
                    return Err(ServiceError::Conflict(format!(
                        "Document is used by exam '{title}'"
                    )));
                }
                self.in_use.insert(document.id.clone(), self.title.to_string());
                Ok(document.id)
            }
            Some(DocumentSource::Inline {
                data_url,
                file_name,
            }) => {
                if data_url.trim().is_empty() {
                    return Err(ServiceError::Invalid(missing.to_string()));
                }
                let (record, data) =
                    prepare_data_url(kind, data_url, file_name.as_deref(), self.max_upload_size)?;
                let id = record.id.clone();
                self.uploads.push((id.clone(), data));
                self.documents.push(record);
                Ok(id)
            }
        }
    }
}

/// Validate an exam creation request and decode any embedded documents.
pub fn prepare_create(
    db: &Database,
    req: &CreateExamRequest,
    max_upload_size: u64,
) -> ServiceResult<PreparedExam> {
    let title = required(&req.title, "Exam title")?;
    let department = required(&req.department, "Department")?;
    let year = required(&req.year, "Year")?;
    let subject = required(&req.subject, "Subject")?;

    let found = db
        .get_department_by_name(&department)?
        .ok_or_else(|| ServiceError::Invalid(format!("Department '{department}' does not exist")))?;
    if !found.has_subject(&year, &subject) {
        return Err(ServiceError::Invalid(format!(
            "'{subject}' is not a {year} subject in {}",
            found.name
        )));
    }

    if let Some(total) = req.total_marks {
        if !total.is_finite() || total <= 0.0 {
            return Err(ServiceError::Invalid(
                "Total marks must be greater than zero".into(),
            ));
        }
    }

    if req.students.is_empty() {
        return Err(ServiceError::Invalid(
            "Please add at least one student with an answer sheet.".into(),
        ));
    }

    let mut in_use = HashMap::new();
    for exam in db.list_exams()? {
        for document_id in exam.document_ids() {
            in_use.insert(document_id, exam.title.clone());
        }
    }

    let mut plan = DocumentPlan {
        db,
        max_upload_size,
        in_use,
        title: &title,
        documents: Vec::new(),
        uploads: Vec::new(),
    };

    let question_paper_id = plan.resolve(
        req.question_paper.as_ref(),
        DocumentKind::QuestionPaper,
        "Please upload the question paper.",
    )?;
    let answer_key_id = plan.resolve(
        req.answer_key.as_ref(),
        DocumentKind::AnswerKey,
        "Please upload the answer key.",
    )?;

    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut submissions = Vec::with_capacity(req.students.len());

    for entry in &req.students {
        let student_id = required(&entry.student_id, "Student")?;
        if !seen.insert(student_id.clone()) {
            return Err(ServiceError::Invalid(format!(
                "Student '{student_id}' is listed more than once"
            )));
        }

        let student = db
            .get_student(&student_id)?
            .ok_or_else(|| ServiceError::Invalid(format!("Student '{student_id}' does not exist")))?;
        if !student.department.eq_ignore_ascii_case(&found.name) || student.year != year {
            return Err(ServiceError::Invalid(format!(
                "{} is not enrolled in {} {year}",
                student.name, found.name
            )));
        }

        let answer_sheet_id = plan.resolve(
            entry.answer_sheet.as_ref(),
            DocumentKind::AnswerSheet,
            &format!("Please upload an answer sheet for {}.", student.name),
        )?;

        submissions.push(Submission {
            student_id: student.id,
            student_name: student.name,
            roll_number: student.roll_number,
            answer_sheet_id,
            submitted_at: now,
            status: SubmissionStatus::Pending,
            evaluation: None,
        });
    }

    let DocumentPlan {
        documents, uploads, ..
    } = plan;

    let exam = Exam {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        department: found.name,
        year,
        subject,
        question_paper_id,
        answer_key_id,
        total_marks: req.total_marks,
        status: ExamStatus::Active,
        created_at: now,
        published_at: None,
        submissions,
    };

    Ok(PreparedExam {
        exam,
        documents,
        uploads,
    })
}

const PUBLISHED_LOCKED: &str =
    "Results for this exam are published; unpublish them to re-evaluate.";

/// Validate a mark sheet for one submission.
pub fn prepare_evaluation(
    db: &Database,
    exam_id: &str,
    student_id: &str,
    req: &EvaluationRequest,
) -> ServiceResult<PreparedEvaluation> {
    let exam = find(db, exam_id)?;
    if exam.status == ExamStatus::Completed {
        return Err(ServiceError::Conflict(PUBLISHED_LOCKED.into()));
    }
    if exam.submission(student_id).is_none() {
        return Err(ServiceError::NotFound("Submission not found".into()));
    }

    req.mark_sheet.validate()?;

    Ok(PreparedEvaluation {
        exam_id: exam.id,
        student_id: student_id.to_string(),
        evaluation: Evaluation {
            marks: req.mark_sheet.total(),
            out_of: req.mark_sheet.max_total(),
            comments: req
                .comments
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
            evaluated_at: Utc::now(),
        },
    })
}

/// The exam after a replicated evaluation. Publishing can win the race with
/// the evaluation, in which case the marks were not recorded.
pub fn confirm_evaluation(db: &Database, prepared: &PreparedEvaluation) -> ServiceResult<Exam> {
    let exam = find(db, &prepared.exam_id)?;
    let recorded = exam
        .submission(&prepared.student_id)
        .and_then(|s| s.evaluation.as_ref())
        == Some(&prepared.evaluation);

    if !recorded && exam.status == ExamStatus::Completed {
        return Err(ServiceError::Conflict(PUBLISHED_LOCKED.into()));
    }
    Ok(exam)
}

pub fn find(db: &Database, id: &str) -> ServiceResult<Exam> {
    db.get_exam(id)?
        .ok_or_else(|| ServiceError::NotFound("Exam not found".into()))
}

/// The exam to delete; its documents go with it.
pub fn plan_delete(db: &Database, id: &str) -> ServiceResult<(WriteOp, Exam)> {
    let exam = find(db, id)?;
    Ok((WriteOp::DeleteExam { id: exam.id.clone() }, exam))
}

/// Exams matching the filter, newest first.
pub fn list(db: &Database, filter: &ExamFilter) -> ServiceResult<Vec<Exam>> {
    let mut exams: Vec<Exam> = db
        .list_exams()?
        .into_iter()
        .filter(|e| matches_filter(filter.department.as_deref(), &e.department))
        .filter(|e| matches_filter(filter.year.as_deref(), &e.year))
        .filter(|e| matches_filter(filter.subject.as_deref(), &e.subject))
        .filter(|e| filter.status.map_or(true, |status| e.status == status))
        .collect();

    exams.reverse();
    Ok(exams)
}

pub fn progress(db: &Database, id: &str) -> ServiceResult<EvaluationProgress> {
    let exam = find(db, id)?;
    Ok(EvaluationProgress::from(&exam))
}
