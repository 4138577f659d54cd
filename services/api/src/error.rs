//! Error types for the api service
//!
//! `LibraryError` is the domain failure taxonomy returned by the ledger,
//! catalog and review operations. `ApiError` turns it into HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::store::constraints;

/// Failure kinds of the library operations
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("This book is currently unavailable")]
    Unavailable,

    #[error("You have already borrowed this book")]
    AlreadyBorrowed,

    #[error("You are not authorized to perform this action")]
    Forbidden,

    #[error("Cannot delete a book with {0} active borrowing(s)")]
    BookInUse(i64),

    #[error("Total copies ({requested}) must be at least 1 and not below the {on_loan} copies on loan")]
    InvalidCopyCount { requested: i32, on_loan: i32 },

    #[error("Admin accounts cannot be deactivated or deleted")]
    ProtectedAccount,

    #[error("You have already reviewed this book")]
    DuplicateReview,

    #[error("{0}")]
    InvalidReview(String),

    #[error("This account has been deactivated")]
    AccountDeactivated,

    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A return would push available copies above total copies
    #[error("Copy accounting violated for book {0}")]
    CopyAccounting(Uuid),

    #[error(transparent)]
    Storage(DatabaseError),

    #[error("File storage error: {0}")]
    Blob(#[from] std::io::Error),
}

impl From<DatabaseError> for LibraryError {
    fn from(err: DatabaseError) -> Self {
        let translated = match (&err, err.constraint()) {
            (DatabaseError::UniqueViolation(_), Some(constraints::ACTIVE_BORROWING)) => {
                Some(LibraryError::AlreadyBorrowed)
            }
            (DatabaseError::UniqueViolation(_), Some(constraints::REVIEW_PER_USER)) => {
                Some(LibraryError::DuplicateReview)
            }
            (DatabaseError::UniqueViolation(_), Some(constraints::BOOK_ISBN)) => Some(
                LibraryError::Validation(vec!["A book with this ISBN already exists.".to_string()]),
            ),
            (DatabaseError::CheckViolation(_), Some(constraints::BOOK_COPIES)) => {
                Some(LibraryError::Unavailable)
            }
            _ => None,
        };

        translated.unwrap_or(LibraryError::Storage(err))
    }
}

impl LibraryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LibraryError::Unavailable
            | LibraryError::AlreadyBorrowed
            | LibraryError::BookInUse(_)
            | LibraryError::DuplicateReview => StatusCode::CONFLICT,
            LibraryError::Forbidden
            | LibraryError::ProtectedAccount
            | LibraryError::AccountDeactivated => StatusCode::FORBIDDEN,
            LibraryError::InvalidCopyCount { .. }
            | LibraryError::InvalidReview(_)
            | LibraryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
            LibraryError::CopyAccounting(_) | LibraryError::Storage(_) | LibraryError::Blob(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type of the library operations
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Domain failure
    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Library(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unauthorized" }),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
            ApiError::Library(err) => {
                let status = err.status_code();
                match err {
                    LibraryError::Validation(errors) => (
                        status,
                        json!({ "error": "Validation failed", "errors": errors }),
                    ),
                    err if status == StatusCode::INTERNAL_SERVER_ERROR => {
                        tracing::error!(error.cause_chain = ?err, "Unexpected error happened");
                        (status, json!({ "error": "Internal server error" }))
                    }
                    err => (status, json!({ "error": err.to_string() })),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_borrowing_index_violation_means_already_borrowed() {
        let err: LibraryError =
            DatabaseError::UniqueViolation(constraints::ACTIVE_BORROWING.to_string()).into();
        assert!(matches!(err, LibraryError::AlreadyBorrowed));
    }

    #[test]
    fn copies_check_violation_means_unavailable() {
        let err: LibraryError =
            DatabaseError::CheckViolation(constraints::BOOK_COPIES.to_string()).into();
        assert!(matches!(err, LibraryError::Unavailable));
    }

    #[test]
    fn unknown_constraint_stays_storage() {
        let err: LibraryError = DatabaseError::UniqueViolation("users_email_key".to_string()).into();
        assert!(matches!(err, LibraryError::Storage(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_errors_do_not_leak_detail() {
        let err = ApiError::from(DatabaseError::Corrupt("role = 'wizard'".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn domain_failures_map_to_client_statuses() {
        assert_eq!(LibraryError::Unavailable.status_code(), StatusCode::CONFLICT);
        assert_eq!(LibraryError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            LibraryError::NotFound("book").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LibraryError::InvalidReview("bad".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
