//! exam-manager's state machine for muster cluster replication.

use std::sync::Arc;

use crate::changes::{ChangeAction, ChangeFeed, Collection};
use crate::storage::models::WriteOp;
use crate::storage::{Database, StoreSnapshot};

type ApplyError = Box<dyn std::error::Error + Send + Sync>;

/// The exam-manager state machine, replicated by muster.
///
/// Every op is applied in a single redb write transaction, so concurrent
/// edits to different parts of the same record never overwrite each other.
pub struct ExamStateMachine {
    db: Database,
    changes: Arc<ChangeFeed>,
}

impl ExamStateMachine {
    pub fn new(db: Database, changes: Arc<ChangeFeed>) -> Self {
        Self { db, changes }
    }

    fn record(&self, collection: Collection, id: Option<&str>, action: ChangeAction) {
        self.changes.record(collection, id, action);
    }
}

impl muster::StateMachine for ExamStateMachine {
    type WriteOp = WriteOp;
    type Snapshot = StoreSnapshot;

    fn apply(&self, op: &WriteOp) -> Result<(), ApplyError> {
        use ChangeAction::*;
        use Collection::*;

        match op {
            WriteOp::CreateTeacher(teacher) => {
                // A racing signup for the same id or email leaves the store as is
                if self.db.insert_teacher(teacher)? {
                    self.record(Teachers, Some(&teacher.teacher_id), Created);
                }
            }
            WriteOp::SetTeacherStatus { teacher_id, status } => {
                if self.db.set_teacher_status(teacher_id, *status)? {
                    self.record(Teachers, Some(teacher_id), Updated);
                }
            }
            WriteOp::DeleteTeacher { teacher_id } => {
                if self.db.delete_teacher(teacher_id)? {
                    self.record(Teachers, Some(teacher_id), Deleted);
                }
            }
            WriteOp::UpsertDepartment(department) => {
                let action = if self.db.get_department(&department.id)?.is_some() {
                    Updated
                } else {
                    Created
                };
                self.db.put_department(department)?;
                self.record(Departments, Some(&department.id), action);
            }
            WriteOp::DeleteDepartment { id } => {
                if self.db.delete_department(id)? {
                    self.record(Departments, Some(id), Deleted);
                }
            }
            WriteOp::ClearDepartments => {
                self.db.clear_departments()?;
                self.record(Departments, None, Cleared);
            }
            WriteOp::CreateStudent(student) => {
                self.db.put_student(student)?;
                self.record(Students, Some(&student.id), Created);
            }
            WriteOp::UpdateStudent(student) => {
                self.db.put_student(student)?;
                self.record(Students, Some(&student.id), Updated);
            }
            WriteOp::DeleteStudent { id } => {
                if self.db.delete_student(id)? {
                    self.record(Students, Some(id), Deleted);
                }
            }
            WriteOp::CreateExam { exam, documents } => {
                self.db.create_exam(exam, documents)?;
                for document in documents {
                    self.record(Documents, Some(&document.id), Created);
                }
                self.record(Exams, Some(&exam.id), Created);
            }
            WriteOp::RecordEvaluation {
                exam_id,
                student_id,
                evaluation,
            } => {
                let outcome = self.db.record_evaluation(exam_id, student_id, evaluation)?;
                if matches!(outcome, crate::storage::EvaluationOutcome::Recorded { .. }) {
                    self.record(Exams, Some(exam_id), Updated);
                }
            }
            WriteOp::DeleteExam { id } => {
                if let Some(removed) = self.db.delete_exam(id)? {
                    for document_id in &removed.document_ids {
                        self.record(Documents, Some(document_id), Deleted);
                    }
                    self.record(Exams, Some(id), Deleted);
                }
            }
            WriteOp::PublishResults {
                exam_id,
                published_at,
            } => {
                if self.db.publish_results(exam_id, *published_at)? {
                    self.record(PublishedResults, Some(exam_id), Created);
                    self.record(Exams, Some(exam_id), Updated);
                }
            }
            WriteOp::UnpublishResults { exam_id } => {
                if self.db.unpublish_results(exam_id)? {
                    self.record(PublishedResults, Some(exam_id), Deleted);
                    self.record(Exams, Some(exam_id), Updated);
                }
            }
            WriteOp::SendNotification(notification) => {
                self.db.send_notification(notification)?;
                self.record(Notifications, Some(&notification.id), Created);
            }
            WriteOp::MarkNotificationsRead {
                teacher_id,
                notification_ids,
            } => {
                let changed = self
                    .db
                    .mark_notifications_read(teacher_id, notification_ids.as_deref())?;
                if changed > 0 {
                    self.record(Notifications, Some(teacher_id), Updated);
                }
            }
            WriteOp::DeleteNotification { id } => {
                if self.db.delete_notification(id)? {
                    self.record(Notifications, Some(id), Deleted);
                }
            }
            WriteOp::CreateDocument(document) => {
                self.db.put_document(document)?;
                self.record(Documents, Some(&document.id), Created);
            }
            WriteOp::DeleteDocument { id } => {
                if self.db.delete_document(id)? {
                    self.record(Documents, Some(id), Deleted);
                }
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<StoreSnapshot, ApplyError> {
        Ok(self.db.export_snapshot()?)
    }

    fn restore(&self, snapshot: StoreSnapshot) -> Result<(), ApplyError> {
        self.db.import_snapshot(&snapshot)?;
        self.record(Collection::All, None, ChangeAction::Restored);
        Ok(())
    }
}
