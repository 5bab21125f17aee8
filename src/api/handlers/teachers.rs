use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::replicate;
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::service::teachers::{self, TeacherFilter};
use crate::storage::models::{Teacher, TeacherStatus};
use crate::AppState;

/// A teacher as returned by the API; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct TeacherProfile {
    pub teacher_id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub subject: String,
    pub status: TeacherStatus,
    pub created_at: String,
}

impl From<&Teacher> for TeacherProfile {
    fn from(teacher: &Teacher) -> Self {
        Self {
            teacher_id: teacher.teacher_id.clone(),
            name: teacher.name.clone(),
            email: teacher.email.clone(),
            department: teacher.department.clone(),
            subject: teacher.subject.clone(),
            status: teacher.status,
            created_at: teacher.created_at.to_rfc3339(),
        }
    }
}

pub async fn list_teachers(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<TeacherFilter>,
) -> Result<Json<JSend<Vec<TeacherProfile>>>, ApiError> {
    let teachers = teachers::list(&state.db, &filter)?;
    Ok(JSend::success(
        teachers.iter().map(TeacherProfile::from).collect(),
    ))
}

/// PUT /teachers/:id/status toggles active and blocked.
pub async fn toggle_teacher_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<TeacherProfile>>, ApiError> {
    let operation = teachers::plan_toggle_status(&state.db, &id)?;
    replicate(&state, operation).await?;

    let teacher = teachers::find(&state.db, &id)?;
    tracing::debug!(teacher_id = %id, status = ?teacher.status, "Changed teacher status");
    Ok(JSend::success(TeacherProfile::from(&teacher)))
}

pub async fn delete_teacher(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let operation = teachers::plan_delete(&state.db, &id)?;
    replicate(&state, operation).await?;

    tracing::debug!(teacher_id = %id, "Deleted teacher");
    Ok(JSend::success(()))
}
