use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use super::replicate;
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::service::exams;
use crate::service::results::{self, ResultsFilter, ReviewFilter, ReviewQueue, StudentResult};
use crate::storage::models::Exam;
use crate::AppState;

pub async fn review_queue(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<ReviewFilter>,
) -> Result<Json<JSend<ReviewQueue>>, ApiError> {
    Ok(JSend::success(results::review_queue(&state.db, &filter)?))
}

pub async fn student_results(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<ResultsFilter>,
) -> Result<Json<JSend<Vec<StudentResult>>>, ApiError> {
    Ok(JSend::success(results::student_results(&state.db, &filter)?))
}

pub async fn publish_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Exam>>, ApiError> {
    let operation = results::plan_publish(&state.db, &id)?;
    replicate(&state, operation).await?;

    tracing::info!(exam_id = %id, "Published results");
    Ok(JSend::success(exams::find(&state.db, &id)?))
}

pub async fn unpublish_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Exam>>, ApiError> {
    let operation = results::plan_unpublish(&state.db, &id)?;
    replicate(&state, operation).await?;

    tracing::info!(exam_id = %id, "Unpublished results");
    Ok(JSend::success(exams::find(&state.db, &id)?))
}
