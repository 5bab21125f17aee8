use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::replicate;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::service::notifications::{self, Inbox, InboxQuery, MarkReadRequest, SendRequest};
use crate::storage::models::{Notification, WriteOp};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub unread_count: usize,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<Notification>>>, ApiError> {
    Ok(JSend::success(notifications::controller_list(&state.db)?))
}

pub async fn send_notification(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SendRequest>,
) -> Result<Json<JSend<Notification>>, ApiError> {
    let notification = notifications::prepare_send(&state.db, &req)?;
    let id = notification.id.clone();
    let recipients = notification.recipients.len();

    replicate(&state, WriteOp::SendNotification(notification)).await?;

    let notification = state
        .db
        .get_notification(&id)?
        .ok_or_else(|| ApiError::internal("Notification not found after send"))?;

    tracing::debug!(notification_id = %id, recipients, "Sent notification");
    Ok(JSend::success(notification))
}

pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let operation = notifications::plan_delete(&state.db, &id)?;
    replicate(&state, operation).await?;

    tracing::debug!(notification_id = %id, "Deleted notification");
    Ok(JSend::success(()))
}

/// GET /teachers/:id/notifications?filter=all|unread|read
pub async fn teacher_inbox(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
    AppQuery(query): AppQuery<InboxQuery>,
) -> Result<Json<JSend<Inbox>>, ApiError> {
    Ok(JSend::success(notifications::inbox(
        &state.db,
        &teacher_id,
        query.filter,
    )?))
}

pub async fn mark_notifications_read(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
    AppJson(req): AppJson<MarkReadRequest>,
) -> Result<Json<JSend<MarkReadResponse>>, ApiError> {
    let operation = notifications::plan_mark_read(&state.db, &teacher_id, &req)?;
    replicate(&state, operation).await?;

    let inbox = notifications::inbox(
        &state.db,
        &teacher_id,
        notifications::ReadFilter::Unread,
    )?;
    Ok(JSend::success(MarkReadResponse {
        unread_count: inbox.unread_count,
    }))
}
