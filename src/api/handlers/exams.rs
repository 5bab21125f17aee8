use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use super::replicate;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::service::exams::{
    self, CreateExamRequest, EvaluationProgress, EvaluationRequest, ExamFilter,
};
use crate::storage::models::Exam;
use crate::AppState;

pub async fn list_exams(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<ExamFilter>,
) -> Result<Json<JSend<Vec<Exam>>>, ApiError> {
    Ok(JSend::success(exams::list(&state.db, &filter)?))
}

pub async fn get_exam(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Exam>>, ApiError> {
    Ok(JSend::success(exams::find(&state.db, &id)?))
}

/// POST /exams with the question paper, answer key and answer sheets either
/// embedded as data URLs or referencing uploaded documents.
pub async fn create_exam(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateExamRequest>,
) -> Result<Json<JSend<Exam>>, ApiError> {
    let prepared = exams::prepare_create(&state.db, &req, state.config.max_upload_size)?;
    let exam_id = prepared.exam.id.clone();
    let (operation, uploads) = prepared.into_write_op();

    // Phase 1: document bytes to object storage
    let mut stored: Vec<String> = Vec::with_capacity(uploads.len());
    for (id, data) in uploads {
        if let Err(e) = state.object_store.put(&id, data).await {
            discard_blobs(&state, &stored).await;
            return Err(ApiError::internal(format!("Failed to store document: {e}")));
        }
        stored.push(id);
    }

    // Phase 2: exam and document metadata via muster
    if let Err(e) = replicate(&state, operation).await {
        discard_blobs(&state, &stored).await;
        return Err(e);
    }

    let exam = exams::find(&state.db, &exam_id)?;
    tracing::debug!(
        exam_id = %exam_id,
        submissions = exam.submissions.len(),
        documents = stored.len(),
        "Created exam"
    );
    Ok(JSend::success(exam))
}

pub async fn delete_exam(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let (operation, exam) = exams::plan_delete(&state.db, &id)?;
    replicate(&state, operation).await?;

    // Documents still attached to another exam keep their metadata and bytes
    let mut orphaned = Vec::new();
    for document_id in exam.document_ids() {
        if state.db.get_document(&document_id)?.is_none() {
            orphaned.push(document_id);
        }
    }
    discard_blobs(&state, &orphaned).await;

    tracing::debug!(exam_id = %id, "Deleted exam");
    Ok(JSend::success(()))
}

pub async fn exam_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<EvaluationProgress>>, ApiError> {
    Ok(JSend::success(exams::progress(&state.db, &id)?))
}

/// POST /exams/:id/submissions/:student_id/evaluation
pub async fn evaluate_submission(
    State(state): State<Arc<AppState>>,
    Path((exam_id, student_id)): Path<(String, String)>,
    AppJson(req): AppJson<EvaluationRequest>,
) -> Result<Json<JSend<Exam>>, ApiError> {
    let prepared = exams::prepare_evaluation(&state.db, &exam_id, &student_id, &req)?;
    replicate(&state, prepared.write_op()).await?;

    let exam = exams::confirm_evaluation(&state.db, &prepared)?;
    tracing::debug!(
        exam_id = %exam_id,
        student_id = %student_id,
        pending = exam.pending_count(),
        "Recorded evaluation"
    );
    Ok(JSend::success(exam))
}

/// Best-effort removal of document blobs.
async fn discard_blobs(state: &AppState, ids: &[String]) {
    for id in ids {
        if let Err(e) = state.object_store.delete(id).await {
            tracing::warn!(document_id = %id, error = %e, "Failed to delete document from object storage");
        }
    }
}
