//! Catalog error kinds and their HTTP mapping

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use bookshelf_db::DbError;
use bookshelf_http::error::AppError;

use super::models::BookId;
use super::store::{BOOK_ISBN_INDEX, REVIEW_BOOK_USER_INDEX};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Missing and not-owned reviews are reported identically
    #[error("review not found or not owned by caller")]
    NotFoundOrUnauthorized,

    #[error("invalid input ({} field errors)", .0.len())]
    InvalidInput(Vec<FieldError>),

    /// Storage failed before anything was written
    #[error("storage unavailable: {0}")]
    Transient(#[source] DbError),

    /// A write landed but a follow-up step did not; the book's summary or
    /// its reviews need reconciliation
    #[error("book {book_id} left inconsistent: {reason}")]
    Inconsistent { book_id: BookId, reason: String },
}

impl CatalogError {
    pub fn book_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "book",
            id: id.to_string(),
        }
    }

    pub fn review_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "review",
            id: id.to_string(),
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput(vec![FieldError::new(field, message)])
    }

    /// Whether the call had no persisted effect and may be retried as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Transient(err) if err.is_retryable())
    }
}

impl From<DbError> for CatalogError {
    fn from(err: DbError) -> Self {
        match err.duplicate_index() {
            Some(REVIEW_BOOK_USER_INDEX) => {
                CatalogError::Conflict("You have already reviewed this book".to_string())
            }
            Some(BOOK_ISBN_INDEX) => {
                CatalogError::Conflict("Book with this ISBN already exists".to_string())
            }
            _ => match err {
                DbError::NotFound { table, id } => CatalogError::NotFound { entity: table, id },
                other => CatalogError::Transient(other),
            },
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { entity, .. } => {
                let mut entity = entity.to_string();
                if let Some(first) = entity.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                AppError::not_found(format!("{} not found", entity))
            }
            CatalogError::Conflict(message) => AppError::conflict(Vec::new(), message),
            CatalogError::Forbidden(message) => AppError::forbidden(message),
            CatalogError::NotFoundOrUnauthorized => {
                AppError::not_found("Review not found or unauthorized")
            }
            CatalogError::InvalidInput(fields) => AppError::validation(
                fields.iter().map(|f| json!(f)).collect(),
                "Request failed validation",
            ),
            CatalogError::Transient(source) => {
                AppError::unavailable(format!("storage temporarily unavailable: {}", source))
            }
            CatalogError::Inconsistent { book_id, reason } => AppError::inconsistent(
                vec![json!({ "bookId": book_id, "reason": reason })],
                "The change was saved but the book's rating summary may be stale",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn duplicate_review_maps_to_conflict() {
        let err = CatalogError::from(DbError::Duplicate {
            table: "review",
            index: REVIEW_BOOK_USER_INDEX,
            value: "b:u".to_string(),
        });
        assert!(matches!(err, CatalogError::Conflict(_)));
    }

    #[test]
    fn unavailable_maps_to_retryable_transient() {
        let err = CatalogError::from(DbError::Unavailable("timeout".to_string()));
        assert!(err.is_retryable());
        assert_eq!(AppError::from(err).status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn http_status_mapping() {
        let cases = [
            (CatalogError::book_not_found("x"), StatusCode::NOT_FOUND),
            (CatalogError::NotFoundOrUnauthorized, StatusCode::NOT_FOUND),
            (CatalogError::Conflict("dup".into()), StatusCode::CONFLICT),
            (CatalogError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                CatalogError::invalid("rating", "out of range"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CatalogError::Inconsistent {
                    book_id: BookId::new(),
                    reason: "recompute failed".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn missing_review_message_does_not_leak_ownership() {
        let owned = AppError::from(CatalogError::NotFoundOrUnauthorized).to_string();
        assert!(owned.contains("not found or unauthorized"));
    }
}
