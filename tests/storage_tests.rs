use std::collections::BTreeMap;

use chrono::Utc;
use exam_manager::storage::models::{
    Audience, Department, DocumentKind, DocumentRecord, Evaluation, Exam, ExamStatus,
    Notification, Priority, Recipient, Student, Submission, SubmissionStatus, Teacher,
    TeacherStatus,
};
use exam_manager::storage::{Database, EvaluationOutcome};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_teacher(id: &str, email: &str) -> Teacher {
    Teacher {
        teacher_id: id.to_string(),
        name: format!("Teacher {id}"),
        email: email.to_string(),
        password_hash: "pbkdf2-sha256$1$AAAA$AAAA".to_string(),
        department: "CSE".to_string(),
        subject: "Algorithms".to_string(),
        status: TeacherStatus::Active,
        created_at: Utc::now(),
    }
}

fn sample_department(id: &str, name: &str) -> Department {
    let now = Utc::now();
    Department {
        id: id.to_string(),
        name: name.to_string(),
        years: BTreeMap::from([(
            "2nd Year".to_string(),
            vec!["Algorithms".to_string(), "Databases".to_string()],
        )]),
        created_at: now,
        updated_at: now,
    }
}

fn sample_student(id: &str, roll: &str) -> Student {
    let now = Utc::now();
    Student {
        id: id.to_string(),
        name: format!("Student {roll}"),
        roll_number: roll.to_string(),
        department: "CSE".to_string(),
        year: "2nd Year".to_string(),
        teacher_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn sample_document(id: &str, kind: DocumentKind) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        kind,
        mime_type: "application/pdf".to_string(),
        byte_size: 2048,
        file_name: None,
        created_at: Utc::now(),
    }
}

fn sample_exam(id: &str, students: &[&str]) -> (Exam, Vec<DocumentRecord>) {
    let now = Utc::now();
    let mut documents = vec![
        sample_document(&format!("{id}-qp"), DocumentKind::QuestionPaper),
        sample_document(&format!("{id}-key"), DocumentKind::AnswerKey),
    ];
    let submissions = students
        .iter()
        .map(|student_id| {
            let sheet = format!("{id}-{student_id}-sheet");
            documents.push(sample_document(&sheet, DocumentKind::AnswerSheet));
            Submission {
                student_id: student_id.to_string(),
                student_name: format!("Student {student_id}"),
                roll_number: format!("R-{student_id}"),
                answer_sheet_id: sheet,
                submitted_at: now,
                status: SubmissionStatus::Pending,
                evaluation: None,
            }
        })
        .collect();

    let exam = Exam {
        id: id.to_string(),
        title: "Midterm".to_string(),
        department: "CSE".to_string(),
        year: "2nd Year".to_string(),
        subject: "Algorithms".to_string(),
        question_paper_id: format!("{id}-qp"),
        answer_key_id: format!("{id}-key"),
        total_marks: Some(100.0),
        status: ExamStatus::Active,
        created_at: now,
        published_at: None,
        submissions,
    };
    (exam, documents)
}

fn evaluation(marks: f64) -> Evaluation {
    Evaluation {
        marks,
        out_of: 100.0,
        comments: None,
        evaluated_at: Utc::now(),
    }
}

fn sample_notification(id: &str, recipients: &[&str]) -> Notification {
    Notification {
        id: id.to_string(),
        title: "Exam schedule".to_string(),
        message: "Midterms start Monday".to_string(),
        priority: Priority::High,
        audience: Audience::Specific,
        recipients: recipients
            .iter()
            .map(|teacher_id| Recipient {
                teacher_id: teacher_id.to_string(),
                name: format!("Teacher {teacher_id}"),
            })
            .collect(),
        sender: "Exam Controller".to_string(),
        sent_at: Utc::now(),
        read_by: Vec::new(),
        recipient_id: None,
        recipient_name: None,
    }
}

// ============================================================================
// Teachers
// ============================================================================

#[test]
fn test_put_and_get_teacher() {
    let (_dir, db) = test_db();
    db.insert_teacher(&sample_teacher("T-1", "ada@oes.edu")).unwrap();

    let teacher = db.get_teacher("T-1").unwrap().expect("teacher should exist");
    assert_eq!(teacher.email, "ada@oes.edu");
    assert_eq!(teacher.status, TeacherStatus::Active);
}

#[test]
fn test_insert_teacher_refuses_taken_id_or_email() {
    let (_dir, db) = test_db();
    assert!(db.insert_teacher(&sample_teacher("T-1", "ada@oes.edu")).unwrap());

    // Same id, different email
    assert!(!db.insert_teacher(&sample_teacher("T-1", "grace@oes.edu")).unwrap());
    // Same email in another case, different id
    assert!(!db.insert_teacher(&sample_teacher("T-2", "ADA@oes.edu")).unwrap());

    let teacher = db
        .get_teacher_by_email("ada@oes.edu")
        .unwrap()
        .expect("first teacher should still resolve");
    assert_eq!(teacher.teacher_id, "T-1");
    assert_eq!(teacher.email, "ada@oes.edu");
    assert!(!db.email_registered("grace@oes.edu").unwrap());
    assert!(db.get_teacher("T-2").unwrap().is_none());
    assert_eq!(db.list_teachers().unwrap().len(), 1);
}

#[test]
fn test_teacher_email_lookup_is_case_insensitive() {
    let (_dir, db) = test_db();
    db.insert_teacher(&sample_teacher("T-1", "Ada@OES.edu")).unwrap();

    assert!(db.email_registered("ada@oes.edu").unwrap());
    let teacher = db
        .get_teacher_by_email("ADA@oes.EDU")
        .unwrap()
        .expect("email should resolve");
    assert_eq!(teacher.teacher_id, "T-1");
    assert!(db.get_teacher_by_email("nobody@oes.edu").unwrap().is_none());
}

#[test]
fn test_set_teacher_status() {
    let (_dir, db) = test_db();
    db.insert_teacher(&sample_teacher("T-1", "ada@oes.edu")).unwrap();

    assert!(db.set_teacher_status("T-1", TeacherStatus::Blocked).unwrap());
    assert_eq!(
        db.get_teacher("T-1").unwrap().unwrap().status,
        TeacherStatus::Blocked
    );
    assert!(!db.set_teacher_status("missing", TeacherStatus::Active).unwrap());
}

#[test]
fn test_delete_teacher_frees_email_and_inbox() {
    let (_dir, db) = test_db();
    db.insert_teacher(&sample_teacher("T-1", "ada@oes.edu")).unwrap();
    db.send_notification(&sample_notification("N-1", &["T-1"])).unwrap();

    assert!(db.delete_teacher("T-1").unwrap());
    assert!(db.get_teacher("T-1").unwrap().is_none());
    assert!(!db.email_registered("ada@oes.edu").unwrap());
    assert!(db.inbox("T-1").unwrap().is_empty());
    assert!(!db.delete_teacher("T-1").unwrap());
}

// ============================================================================
// Departments and students
// ============================================================================

#[test]
fn test_department_name_index_follows_renames() {
    let (_dir, db) = test_db();
    db.put_department(&sample_department("D-1", "CSE")).unwrap();

    assert_eq!(
        db.get_department_by_name("cse").unwrap().unwrap().id,
        "D-1"
    );

    let mut renamed = sample_department("D-1", "Computer Science");
    renamed.years.insert("3rd Year".to_string(), vec!["Compilers".to_string()]);
    db.put_department(&renamed).unwrap();

    assert!(db.get_department_by_name("CSE").unwrap().is_none());
    let found = db
        .get_department_by_name("computer science")
        .unwrap()
        .expect("renamed department should resolve");
    assert!(found.has_subject("3rd Year", "Compilers"));
    assert!(!found.has_subject("3rd Year", "Algorithms"));
}

#[test]
fn test_delete_and_clear_departments() {
    let (_dir, db) = test_db();
    db.put_department(&sample_department("D-1", "CSE")).unwrap();
    db.put_department(&sample_department("D-2", "ECE")).unwrap();
    db.put_department(&sample_department("D-3", "MECH")).unwrap();

    assert!(db.delete_department("D-1").unwrap());
    assert!(db.get_department_by_name("CSE").unwrap().is_none());

    assert_eq!(db.clear_departments().unwrap(), 2);
    assert!(db.list_departments().unwrap().is_empty());
    assert!(db.get_department_by_name("ECE").unwrap().is_none());
}

#[test]
fn test_student_crud() {
    let (_dir, db) = test_db();
    db.put_student(&sample_student("S-1", "21CS001")).unwrap();
    db.put_student(&sample_student("S-2", "21CS002")).unwrap();
    assert_eq!(db.list_students().unwrap().len(), 2);

    let mut updated = sample_student("S-1", "21CS001");
    updated.name = "Grace".to_string();
    db.put_student(&updated).unwrap();
    assert_eq!(db.get_student("S-1").unwrap().unwrap().name, "Grace");

    assert!(db.delete_student("S-2").unwrap());
    assert!(!db.delete_student("S-2").unwrap());
    assert_eq!(db.list_students().unwrap().len(), 1);
}

// ============================================================================
// Exams and results
// ============================================================================

#[test]
fn test_create_exam_stores_documents() {
    let (_dir, db) = test_db();
    let (exam, documents) = sample_exam("E-1", &["S-1", "S-2"]);
    db.create_exam(&exam, &documents).unwrap();

    let stored = db.get_exam("E-1").unwrap().expect("exam should exist");
    assert_eq!(stored.submissions.len(), 2);
    assert_eq!(stored.pending_count(), 2);
    assert_eq!(db.list_documents().unwrap().len(), 4);
    assert_eq!(
        db.get_document("E-1-qp").unwrap().unwrap().kind,
        DocumentKind::QuestionPaper
    );
}

#[test]
fn test_record_evaluation_moves_exam_to_submitted() {
    let (_dir, db) = test_db();
    let (exam, documents) = sample_exam("E-1", &["S-1", "S-2"]);
    db.create_exam(&exam, &documents).unwrap();

    let outcome = db.record_evaluation("E-1", "S-1", &evaluation(72.0)).unwrap();
    assert_eq!(
        outcome,
        EvaluationOutcome::Recorded {
            exam_status: ExamStatus::Active
        }
    );

    let outcome = db.record_evaluation("E-1", "S-2", &evaluation(85.0)).unwrap();
    assert_eq!(
        outcome,
        EvaluationOutcome::Recorded {
            exam_status: ExamStatus::Submitted
        }
    );

    let exam = db.get_exam("E-1").unwrap().unwrap();
    assert!(exam.is_eligible_for_publication());
    assert_eq!(exam.submission("S-2").unwrap().marks(), Some(85.0));
}

#[test]
fn test_record_evaluation_unknown_targets() {
    let (_dir, db) = test_db();
    let (exam, documents) = sample_exam("E-1", &["S-1"]);
    db.create_exam(&exam, &documents).unwrap();

    assert_eq!(
        db.record_evaluation("missing", "S-1", &evaluation(1.0)).unwrap(),
        EvaluationOutcome::ExamNotFound
    );
    assert_eq!(
        db.record_evaluation("E-1", "S-9", &evaluation(1.0)).unwrap(),
        EvaluationOutcome::SubmissionNotFound
    );
}

#[test]
fn test_record_evaluation_refused_after_publication() {
    let (_dir, db) = test_db();
    let (exam, documents) = sample_exam("E-1", &["S-1"]);
    db.create_exam(&exam, &documents).unwrap();
    db.record_evaluation("E-1", "S-1", &evaluation(90.0)).unwrap();
    db.publish_results("E-1", Utc::now()).unwrap();

    assert_eq!(
        db.record_evaluation("E-1", "S-1", &evaluation(10.0)).unwrap(),
        EvaluationOutcome::ExamCompleted
    );
    let exam = db.get_exam("E-1").unwrap().unwrap();
    assert_eq!(exam.status, ExamStatus::Completed);
    assert_eq!(exam.submission("S-1").unwrap().marks(), Some(90.0));
}

#[test]
fn test_publish_and_unpublish_results() {
    let (_dir, db) = test_db();
    let (exam, documents) = sample_exam("E-1", &["S-1"]);
    db.create_exam(&exam, &documents).unwrap();
    db.record_evaluation("E-1", "S-1", &evaluation(90.0)).unwrap();

    let at = Utc::now();
    assert!(db.publish_results("E-1", at).unwrap());
    assert!(db.is_published("E-1").unwrap());
    let exam = db.get_exam("E-1").unwrap().unwrap();
    assert_eq!(exam.status, ExamStatus::Completed);
    assert_eq!(exam.published_at, Some(at));
    assert_eq!(
        db.published_results().unwrap().get("E-1"),
        Some(&at.to_rfc3339())
    );

    assert!(db.unpublish_results("E-1").unwrap());
    assert!(!db.is_published("E-1").unwrap());
    let exam = db.get_exam("E-1").unwrap().unwrap();
    assert_eq!(exam.status, ExamStatus::Submitted);
    assert_eq!(exam.published_at, None);

    assert!(!db.unpublish_results("E-1").unwrap());
    assert!(!db.publish_results("missing", at).unwrap());
}

#[test]
fn test_delete_exam_removes_documents_and_publication() {
    let (_dir, db) = test_db();
    let (exam, documents) = sample_exam("E-1", &["S-1"]);
    db.create_exam(&exam, &documents).unwrap();
    db.put_document(&sample_document("loose", DocumentKind::Attachment))
        .unwrap();
    db.record_evaluation("E-1", "S-1", &evaluation(50.0)).unwrap();
    db.publish_results("E-1", Utc::now()).unwrap();

    let removed = db.delete_exam("E-1").unwrap().expect("exam should be returned");
    assert_eq!(removed.exam.id, "E-1");
    assert_eq!(removed.document_ids.len(), 3);
    assert!(db.get_exam("E-1").unwrap().is_none());
    assert!(!db.is_published("E-1").unwrap());

    let remaining = db.list_documents().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "loose");

    assert!(db.delete_exam("E-1").unwrap().is_none());
}

#[test]
fn test_delete_exam_keeps_documents_shared_with_other_exams() {
    let (_dir, db) = test_db();
    let (first, documents) = sample_exam("E-1", &["S-1"]);
    db.create_exam(&first, &documents).unwrap();

    let (mut second, documents) = sample_exam("E-2", &["S-2"]);
    second.question_paper_id = "E-1-qp".to_string();
    let documents: Vec<DocumentRecord> =
        documents.into_iter().filter(|d| d.id != "E-2-qp").collect();
    db.create_exam(&second, &documents).unwrap();

    let removed = db.delete_exam("E-1").unwrap().expect("exam should be returned");
    assert!(!removed.document_ids.contains(&"E-1-qp".to_string()));
    assert_eq!(removed.document_ids.len(), 2);

    assert!(db.get_document("E-1-qp").unwrap().is_some());
    assert!(db.get_document("E-1-key").unwrap().is_none());

    let removed = db.delete_exam("E-2").unwrap().expect("exam should be returned");
    assert!(removed.document_ids.contains(&"E-1-qp".to_string()));
    assert!(db.list_documents().unwrap().is_empty());
}

// ============================================================================
// Notifications
// ============================================================================

#[test]
fn test_send_notification_fills_inboxes_newest_first() {
    let (_dir, db) = test_db();
    db.send_notification(&sample_notification("N-1", &["T-1", "T-2"]))
        .unwrap();
    db.send_notification(&sample_notification("N-2", &["T-1"]))
        .unwrap();

    let inbox = db.inbox("T-1").unwrap();
    let ids: Vec<&str> = inbox.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["N-2", "N-1"]);
    assert_eq!(inbox[0].recipient_id.as_deref(), Some("T-1"));
    assert_eq!(inbox[0].recipient_name.as_deref(), Some("Teacher T-1"));

    assert_eq!(db.inbox("T-2").unwrap().len(), 1);
    assert_eq!(db.list_notifications().unwrap().len(), 2);
}

#[test]
fn test_mark_notifications_read_mirrors_into_log() {
    let (_dir, db) = test_db();
    db.send_notification(&sample_notification("N-1", &["T-1", "T-2"]))
        .unwrap();
    db.send_notification(&sample_notification("N-2", &["T-1"]))
        .unwrap();

    let ids = vec!["N-1".to_string()];
    assert_eq!(db.mark_notifications_read("T-1", Some(ids.as_slice())).unwrap(), 1);
    assert_eq!(db.mark_notifications_read("T-1", Some(ids.as_slice())).unwrap(), 0);

    let logged = db.get_notification("N-1").unwrap().unwrap();
    assert_eq!(logged.read_by, vec!["T-1".to_string()]);
    assert!(!db.inbox("T-2").unwrap()[0].is_read_by("T-2"));

    assert_eq!(db.mark_notifications_read("T-1", None).unwrap(), 1);
    assert!(db.inbox("T-1").unwrap().iter().all(|n| n.is_read_by("T-1")));
}

#[test]
fn test_delete_notification_keeps_inbox_copies() {
    let (_dir, db) = test_db();
    db.send_notification(&sample_notification("N-1", &["T-1"]))
        .unwrap();

    assert!(db.delete_notification("N-1").unwrap());
    assert!(db.get_notification("N-1").unwrap().is_none());
    assert_eq!(db.inbox("T-1").unwrap().len(), 1);
}

// ============================================================================
// Purge and snapshots
// ============================================================================

#[test]
fn test_purge_all() {
    let (_dir, db) = test_db();
    db.insert_teacher(&sample_teacher("T-1", "ada@oes.edu")).unwrap();
    db.put_department(&sample_department("D-1", "CSE")).unwrap();
    db.put_student(&sample_student("S-1", "21CS001")).unwrap();
    let (exam, documents) = sample_exam("E-1", &["S-1"]);
    db.create_exam(&exam, &documents).unwrap();
    db.send_notification(&sample_notification("N-1", &["T-1"]))
        .unwrap();

    let stats = db.purge_all().unwrap();
    assert_eq!(stats.teachers, 1);
    assert_eq!(stats.departments, 1);
    assert_eq!(stats.students, 1);
    assert_eq!(stats.exams, 1);
    assert_eq!(stats.notifications, 1);
    assert_eq!(stats.documents, 3);

    assert!(!db.email_registered("ada@oes.edu").unwrap());
    assert!(db.get_department_by_name("CSE").unwrap().is_none());
    assert!(db.inbox("T-1").unwrap().is_empty());
}

#[test]
fn test_snapshot_restores_into_another_store() {
    let (_dir, source) = test_db();
    source.insert_teacher(&sample_teacher("T-1", "ada@oes.edu")).unwrap();
    source.put_department(&sample_department("D-1", "CSE")).unwrap();
    let (exam, documents) = sample_exam("E-1", &["S-1"]);
    source.create_exam(&exam, &documents).unwrap();
    source.record_evaluation("E-1", "S-1", &evaluation(64.0)).unwrap();
    source.publish_results("E-1", Utc::now()).unwrap();
    source
        .send_notification(&sample_notification("N-1", &["T-1"]))
        .unwrap();

    let (_other_dir, target) = test_db();
    target.insert_teacher(&sample_teacher("T-9", "stale@oes.edu")).unwrap();
    target.import_snapshot(&source.export_snapshot().unwrap()).unwrap();

    assert!(target.get_teacher("T-9").unwrap().is_none());
    assert!(!target.email_registered("stale@oes.edu").unwrap());
    assert!(target.get_teacher_by_email("ada@oes.edu").unwrap().is_some());
    assert!(target.get_department_by_name("cse").unwrap().is_some());
    assert!(target.is_published("E-1").unwrap());
    assert_eq!(target.inbox("T-1").unwrap().len(), 1);
    assert_eq!(target.list_documents().unwrap().len(), 3);
}
