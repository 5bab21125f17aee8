use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::changes::{ChangeAction, Collection};
use crate::storage::PurgeStats;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub node_id: String,
    pub change_sequence: u64,
}

/// muster's view of the cluster plus this node's change-feed position.
#[derive(Debug, Serialize)]
pub struct ClusterStatusResponse {
    pub cluster_info: serde_json::Value,
    pub single_node: bool,
    pub change_sequence: u64,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    #[serde(flatten)]
    pub deleted: PurgeStats,
    pub blobs_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        node_id: state.config.node.id.clone(),
        change_sequence: state.changes.latest(),
    })
}

pub async fn cluster_status(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<ClusterStatusResponse>> {
    let info = state.node.cluster_info().await;
    let peers: Vec<serde_json::Value> = info
        .peers
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "address": p.address,
                "status": format!("{:?}", p.status),
                "sequence": p.sequence,
            })
        })
        .collect();

    JSend::success(ClusterStatusResponse {
        cluster_info: serde_json::json!({
            "node_id": info.node_id,
            "role": format!("{:?}", info.role),
            "term": info.term,
            "leader_id": info.leader_id,
            "sequence": info.sequence,
            "peers": peers,
        }),
        single_node: state.config.is_single_node(),
        change_sequence: state.changes.latest(),
    })
}

/// Wipe every collection on this node and the document blobs it knows about.
pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let documents = state.db.list_documents()?;
    let stats = state.db.purge_all()?;

    let mut blobs_deleted = 0;
    for document in &documents {
        match state.object_store.delete(&document.id).await {
            Ok(()) => blobs_deleted += 1,
            Err(e) => {
                tracing::warn!(document_id = %document.id, error = %e, "Failed to delete blob during purge")
            }
        }
    }

    state.changes.record(Collection::All, None, ChangeAction::Cleared);

    tracing::warn!(
        teachers = stats.teachers,
        departments = stats.departments,
        students = stats.students,
        exams = stats.exams,
        notifications = stats.notifications,
        documents = stats.documents,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        deleted: stats,
        blobs_deleted,
    }))
}
