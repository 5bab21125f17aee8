//! JSend envelopes and the error type every handler returns.
//!
//! `success` carries data, `fail` (4xx) carries `data.message`, and `error`
//! (5xx) carries a top-level `message`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::object_store::ObjectStoreError;
use crate::service::ServiceError;
use crate::storage::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Error,
    Fail,
    Success,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JSend<T: Serialize> {
    pub data: T,
    pub status: JSendStatus,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<JSend<T>> {
        Json(JSend {
            data,
            status: JSendStatus::Success,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailData {
    pub message: String,
}

/// Body of a rejected request or server failure.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JSendProblem {
    Fail {
        data: FailData,
        status: JSendStatus,
    },
    Error {
        message: String,
        status: JSendStatus,
    },
}

// ============================================================================
// Handler errors
// ============================================================================

/// An HTTP error rendered as JSend `fail` below 500 and `error` from 500 up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn body(&self) -> JSendProblem {
        if self.status.is_server_error() {
            JSendProblem::Error {
                message: self.message.clone(),
                status: JSendStatus::Error,
            }
        } else {
            JSendProblem::Fail {
                data: FailData {
                    message: self.message.clone(),
                },
                status: JSendStatus::Fail,
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "Request failed");
        }
        (self.status, Json(self.body())).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Invalid(msg) => ApiError::bad_request(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::Database(e) => e.into(),
            ServiceError::Internal(msg) => ApiError::internal(msg),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<ObjectStoreError> for ApiError {
    fn from(e: ObjectStoreError) -> Self {
        match e {
            ObjectStoreError::NotFound(_) => ApiError::not_found("Document content not found"),
            ObjectStoreError::InvalidKey(key) => {
                ApiError::bad_request(format!("Invalid document id: {key}"))
            }
            other => ApiError::internal(format!("Document storage failed: {other}")),
        }
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// `axum::Json` with JSend rejections.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(json_rejection_message(&rejection)))?;
        Ok(AppJson(value))
    }
}

fn json_rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(err) => format!("Invalid request body: {}", err.body_text()),
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
        JsonRejection::MissingJsonContentType(_) => {
            "Missing Content-Type: application/json header".into()
        }
        JsonRejection::BytesRejection(_) => {
            "Request body is too large or could not be read".into()
        }
        _ => "Failed to read request body".into(),
    }
}

/// Query-string extractor backed by serde_qs, rejecting with JSend.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(query_error_message(&e.to_string())))
    }
}

/// Reword serde's primitive type names for API clients.
fn query_error_message(raw: &str) -> String {
    let cleaned = raw
        .replace("u64", "non-negative integer")
        .replace("usize", "non-negative integer")
        .replace("f64", "number")
        .replace("unknown variant", "unsupported value");

    format!("Invalid query parameter: {cleaned}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_render_as_fail() {
        let body = serde_json::to_value(ApiError::conflict("Results are already published.").body())
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "data": { "message": "Results are already published." },
                "status": "fail"
            })
        );
    }

    #[test]
    fn test_server_errors_render_as_error() {
        let error = ApiError::unavailable("No leader available, retry shortly");
        let body = serde_json::to_value(error.body()).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "No leader available, retry shortly");
    }

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::Invalid("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_query_error_message() {
        assert_eq!(
            query_error_message("invalid type: string \"soon\", expected u64"),
            "Invalid query parameter: invalid type: string \"soon\", expected non-negative integer"
        );
    }
}
