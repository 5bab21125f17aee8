use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::replicate;
use super::teachers::TeacherProfile;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::service::{auth, teachers, ServiceError};
use crate::storage::models::WriteOp;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ControllerProfile {
    pub email: String,
    pub role: &'static str,
}

pub async fn teacher_signup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<teachers::SignupRequest>,
) -> Result<Json<JSend<TeacherProfile>>, ApiError> {
    let teacher = teachers::prepare_signup(&state.db, &req)?;
    replicate(&state, WriteOp::CreateTeacher(teacher.clone())).await?;
    let teacher = teachers::confirm_signup(&state.db, &teacher)?;

    tracing::debug!(teacher_id = %teacher.teacher_id, "Teacher signed up");
    Ok(JSend::success(TeacherProfile::from(&teacher)))
}

pub async fn teacher_login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<JSend<TeacherProfile>>, ApiError> {
    let teacher = auth::teacher_login(&state.db, &req.email, &req.password)?;
    tracing::debug!(teacher_id = %teacher.teacher_id, "Teacher logged in");
    Ok(JSend::success(TeacherProfile::from(&teacher)))
}

pub async fn controller_login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<JSend<ControllerProfile>>, ApiError> {
    if let Err(e) = auth::controller_login(&state.config.controller, &req.email, &req.password) {
        if matches!(e, ServiceError::Unauthorized(_)) {
            tracing::info!(email = %req.email, "Rejected controller login");
        }
        return Err(e.into());
    }

    Ok(JSend::success(ControllerProfile {
        email: state.config.controller.email.clone(),
        role: "controller",
    }))
}
