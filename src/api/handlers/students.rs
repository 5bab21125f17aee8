use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use super::replicate;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::service::students::{self, StudentFilter, StudentRequest};
use crate::storage::models::{Student, WriteOp};
use crate::AppState;

pub async fn list_students(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<StudentFilter>,
) -> Result<Json<JSend<Vec<Student>>>, ApiError> {
    Ok(JSend::success(students::list(&state.db, &filter)?))
}

pub async fn get_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Student>>, ApiError> {
    Ok(JSend::success(students::find(&state.db, &id)?))
}

pub async fn create_student(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StudentRequest>,
) -> Result<Json<JSend<Student>>, ApiError> {
    let student = students::prepare_create(&state.db, &req)?;
    let id = student.id.clone();

    replicate(&state, WriteOp::CreateStudent(student)).await?;

    let student = students::find(&state.db, &id)?;
    tracing::debug!(student_id = %id, roll_number = %student.roll_number, "Created student");
    Ok(JSend::success(student))
}

pub async fn update_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<StudentRequest>,
) -> Result<Json<JSend<Student>>, ApiError> {
    let student = students::prepare_update(&state.db, &id, &req)?;
    replicate(&state, WriteOp::UpdateStudent(student)).await?;

    tracing::debug!(student_id = %id, "Updated student");
    Ok(JSend::success(students::find(&state.db, &id)?))
}

pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let operation = students::plan_delete(&state.db, &id)?;
    replicate(&state, operation).await?;

    tracing::debug!(student_id = %id, "Deleted student");
    Ok(JSend::success(()))
}
