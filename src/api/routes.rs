use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Exam creation embeds several documents as base64, so its body may be
/// this many uploads in size.
const EXAM_BODY_UPLOADS: usize = 16;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;
    let exam_body_limit = upload_limit.saturating_mul(EXAM_BODY_UPLOADS);

    let mut router = Router::new()
        // Auth
        .route("/auth/teachers/signup", post(handlers::teacher_signup))
        .route("/auth/teachers/login", post(handlers::teacher_login))
        .route("/auth/controller/login", post(handlers::controller_login))
        // Teachers
        .route("/teachers", get(handlers::list_teachers))
        .route("/teachers/:id", delete(handlers::delete_teacher))
        .route("/teachers/:id/status", put(handlers::toggle_teacher_status))
        .route(
            "/teachers/:id/notifications",
            get(handlers::teacher_inbox),
        )
        .route(
            "/teachers/:id/notifications/read",
            post(handlers::mark_notifications_read),
        )
        // Departments
        .route(
            "/departments",
            get(handlers::list_departments)
                .post(handlers::upsert_department)
                .delete(handlers::clear_departments),
        )
        .route(
            "/departments/:id",
            get(handlers::get_department).delete(handlers::delete_department),
        )
        // Students
        .route(
            "/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/students/:id",
            get(handlers::get_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        )
        // Exams
        .route("/exams", get(handlers::list_exams))
        .route(
            "/exams",
            post(handlers::create_exam).layer(DefaultBodyLimit::max(exam_body_limit)),
        )
        .route(
            "/exams/:id",
            get(handlers::get_exam).delete(handlers::delete_exam),
        )
        .route("/exams/:id/progress", get(handlers::exam_progress))
        .route(
            "/exams/:id/submissions/:student_id/evaluation",
            post(handlers::evaluate_submission),
        )
        .route("/exams/:id/publish", post(handlers::publish_results))
        .route("/exams/:id/unpublish", post(handlers::unpublish_results))
        // Results
        .route("/results/review", get(handlers::review_queue))
        .route("/results", get(handlers::student_results))
        // Documents
        .route(
            "/documents",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/documents/:id/content", get(handlers::document_content))
        .route("/documents/:id/data-url", get(handlers::document_data_url))
        // Notifications
        .route(
            "/notifications",
            get(handlers::list_notifications).post(handlers::send_notification),
        )
        .route("/notifications/:id", delete(handlers::delete_notification))
        // Dashboards
        .route("/dashboard/controller", get(handlers::controller_dashboard))
        .route(
            "/dashboard/teachers/:id",
            get(handlers::teacher_dashboard),
        )
        // Change feed
        .route("/changes", get(handlers::poll_changes))
        // Internal
        .route("/_internal/cluster/status", get(handlers::cluster_status))
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
