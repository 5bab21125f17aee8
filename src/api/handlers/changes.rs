use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::response::{AppQuery, JSend};
use crate::changes::ChangeBatch;
use crate::AppState;

/// Longest a client may hold a `/changes` request open.
const MAX_WAIT_MS: u64 = 30_000;

#[derive(Debug, Deserialize)]
pub struct ChangesParams {
    #[serde(default)]
    pub since: u64,
    #[serde(default)]
    pub wait_ms: u64,
}

/// GET /changes?since=N&wait_ms=M
pub async fn poll_changes(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ChangesParams>,
) -> Json<JSend<ChangeBatch>> {
    let wait = Duration::from_millis(params.wait_ms.min(MAX_WAIT_MS));
    JSend::success(state.changes.wait_since(params.since, wait).await)
}
