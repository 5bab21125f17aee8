use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::service::dashboard::{self, ControllerDashboard, TeacherDashboard};
use crate::AppState;

pub async fn controller_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<ControllerDashboard>>, ApiError> {
    Ok(JSend::success(dashboard::controller(&state.db)?))
}

pub async fn teacher_dashboard(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
) -> Result<Json<JSend<TeacherDashboard>>, ApiError> {
    Ok(JSend::success(dashboard::teacher(&state.db, &teacher_id)?))
}
