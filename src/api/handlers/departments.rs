use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::replicate;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::service::departments::{self, DepartmentRequest};
use crate::storage::models::{Department, WriteOp};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub departments_deleted: usize,
}

pub async fn list_departments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<Department>>>, ApiError> {
    Ok(JSend::success(departments::list(&state.db)?))
}

pub async fn get_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Department>>, ApiError> {
    Ok(JSend::success(departments::find(&state.db, &id)?))
}

/// POST /departments adds a department, or sets one year's subjects on an
/// existing department with the same name.
pub async fn upsert_department(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<DepartmentRequest>,
) -> Result<Json<JSend<Department>>, ApiError> {
    let department = departments::prepare_upsert(&state.db, &req)?;
    let id = department.id.clone();

    replicate(&state, WriteOp::UpsertDepartment(department)).await?;

    let department = state
        .db
        .get_department(&id)?
        .ok_or_else(|| ApiError::internal("Department not found after update"))?;

    tracing::debug!(department_id = %id, name = %department.name, "Saved department");
    Ok(JSend::success(department))
}

pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let operation = departments::plan_delete(&state.db, &id)?;
    replicate(&state, operation).await?;

    tracing::debug!(department_id = %id, "Deleted department");
    Ok(JSend::success(()))
}

pub async fn clear_departments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<ClearResponse>>, ApiError> {
    let count = state.db.list_departments()?.len();
    replicate(&state, WriteOp::ClearDepartments).await?;

    tracing::debug!(count, "Cleared departments");
    Ok(JSend::success(ClearResponse {
        departments_deleted: count,
    }))
}
