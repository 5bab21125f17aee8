use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

use super::replicate;
use crate::api::response::{ApiError, JSend};
use crate::data_url::DataUrl;
use crate::service::documents;
use crate::storage::models::{DocumentKind, DocumentRecord, WriteOp};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DataUrlResponse {
    pub id: String,
    pub data_url: String,
}

/// POST /documents (multipart: `file`, optional `kind`)
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<DocumentRecord>>, ApiError> {
    let mut data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut kind = DocumentKind::Attachment;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if bytes.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }
                data = Some(bytes);
            }
            "kind" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid kind: {e}")))?;
                kind = serde_json::from_value(serde_json::Value::String(text.trim().to_string()))
                    .map_err(|_| {
                        ApiError::bad_request(
                            "kind must be one of question_paper, answer_key, answer_sheet, attachment",
                        )
                    })?;
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let record = documents::prepare_upload(
        kind,
        content_type.as_deref(),
        file_name.as_deref(),
        data.len() as u64,
        state.config.max_upload_size,
    )?;
    let id = record.id.clone();

    // Bytes first, then the replicated metadata
    state
        .object_store
        .put(&id, data)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store document: {e}")))?;

    if let Err(e) = replicate(&state, WriteOp::CreateDocument(record)).await {
        let _ = state.object_store.delete(&id).await;
        return Err(e);
    }

    tracing::debug!(document_id = %id, kind = ?kind, "Uploaded document");
    Ok(JSend::success(documents::find(&state.db, &id)?))
}

/// DELETE /documents/:id removes an unused upload and its bytes.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let operation = documents::plan_delete(&state.db, &id)?;
    replicate(&state, operation).await?;

    if let Err(e) = state.object_store.delete(&id).await {
        tracing::warn!(document_id = %id, error = %e, "Failed to delete document from object storage");
    }

    tracing::debug!(document_id = %id, "Deleted document");
    Ok(JSend::success(()))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<DocumentRecord>>, ApiError> {
    Ok(JSend::success(documents::find(&state.db, &id)?))
}

async fn load_content(state: &AppState, id: &str) -> Result<(DocumentRecord, Bytes), ApiError> {
    let document = documents::find(&state.db, id)?;
    let data = state.object_store.get(&document.id).await?;
    Ok((document, data))
}

/// GET /documents/:id/content serves the raw bytes for inline viewing.
pub async fn document_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (document, data) = load_content(&state, &id).await?;
    let length = data.len() as u64;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        document
            .mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(length));

    let filename = document.file_name.as_deref().unwrap_or(&document.id);
    if let Ok(value) = format!("inline; filename=\"{}\"", filename.replace('"', "")).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Documents never change once uploaded
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, max-age=3600"),
    );

    Ok(response)
}

/// GET /documents/:id/data-url returns the document as a base64 data URL.
pub async fn document_data_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<DataUrlResponse>>, ApiError> {
    let (document, data) = load_content(&state, &id).await?;
    Ok(JSend::success(DataUrlResponse {
        data_url: DataUrl::encode(&document.mime_type, &data),
        id: document.id,
    }))
}
