//! Validation and planning for each portal.
//!
//! Functions here read the store, check a request and hand back the record or
//! [`WriteOp`](crate::storage::models::WriteOp) to replicate. They never write;
//! every mutation goes through the state machine.

pub mod auth;
pub mod dashboard;
pub mod departments;
pub mod documents;
pub mod exams;
pub mod notifications;
pub mod results;
pub mod students;
pub mod teachers;

use thiserror::Error;

use crate::data_url::DataUrlError;
use crate::grading::GradingError;
use crate::storage::DatabaseError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request failed validation
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("{0}")]
    Internal(String),
}

impl From<GradingError> for ServiceError {
    fn from(e: GradingError) -> Self {
        ServiceError::Invalid(e.to_string())
    }
}

impl From<DataUrlError> for ServiceError {
    fn from(e: DataUrlError) -> Self {
        ServiceError::Invalid(format!("Invalid document: {e}"))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trim a required text field, rejecting it when blank.
pub(crate) fn required(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive substring match against any of `fields`.
pub(crate) fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let term = term.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&term))
        }
        None => true,
    }
}

/// Optional filter equality; `None`, blank and `"all"` match everything.
pub(crate) fn matches_filter(filter: Option<&str>, value: &str) -> bool {
    match filter.map(str::trim) {
        None | Some("") | Some("all") => true,
        Some(wanted) => wanted == value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Physics ", "subject").unwrap(), "Physics");
        let err = required("   ", "subject").unwrap_err();
        assert_eq!(err.to_string(), "subject is required");
    }

    #[test]
    fn test_search_and_filter() {
        assert!(matches_search(None, &["anything"]));
        assert!(matches_search(Some("  "), &["anything"]));
        assert!(matches_search(Some("CALC"), &["Advanced Calculus", "MATH"]));
        assert!(!matches_search(Some("bio"), &["Advanced Calculus", "MATH"]));

        assert!(matches_filter(Some("all"), "CSE"));
        assert!(matches_filter(None, "CSE"));
        assert!(matches_filter(Some("CSE"), "CSE"));
        assert!(!matches_filter(Some("ECE"), "CSE"));
    }
}
