mod admin;
mod auth;
mod changes;
mod dashboard;
mod departments;
mod documents;
mod exams;
mod notifications;
mod results;
mod students;
mod teachers;

use crate::api::response::ApiError;
use crate::storage::models::WriteOp;
use crate::AppState;

pub use admin::{admin_purge, cluster_status, health};
pub use auth::{controller_login, teacher_login, teacher_signup};
pub use changes::poll_changes;
pub use dashboard::{controller_dashboard, teacher_dashboard};
pub use departments::{
    clear_departments, delete_department, get_department, list_departments, upsert_department,
};
pub use documents::{
    delete_document, document_content, document_data_url, get_document, upload_document,
};
pub use exams::{
    create_exam, delete_exam, evaluate_submission, exam_progress, get_exam, list_exams,
};
pub use notifications::{
    delete_notification, list_notifications, mark_notifications_read, send_notification,
    teacher_inbox,
};
pub use results::{publish_results, review_queue, student_results, unpublish_results};
pub use students::{create_student, delete_student, get_student, list_students, update_student};
pub use teachers::{delete_teacher, list_teachers, toggle_teacher_status};

/// Map a MusterError to an ApiError
fn replication_error(e: muster::MusterError) -> ApiError {
    match e {
        muster::MusterError::NotLeader { .. } => {
            ApiError::unavailable("No leader available, retry shortly")
        }
        muster::MusterError::NoQuorum => {
            ApiError::unavailable("Failed to reach quorum for replication")
        }
        _ => ApiError::internal(e.to_string()),
    }
}

/// Replicate a write through the cluster; it is applied locally before this returns.
async fn replicate(state: &AppState, operation: WriteOp) -> Result<(), ApiError> {
    state
        .node
        .replicate(operation)
        .await
        .map_err(replication_error)
}
