//! Custom error types for the common library
//!
//! This module defines the persistence error type shared by every service.
//! Constraint violations are classified so that callers can turn them into
//! domain failures instead of generic storage errors.

use sqlx::Error as SqlxError;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A unique constraint or unique index rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A check constraint rejected the write
    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    /// A stored value could not be mapped back into a domain type
    #[error("Invalid stored value: {0}")]
    Corrupt(String),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Classify a query failure, pulling constraint violations out of the
    /// driver error so they can be matched by constraint name.
    pub fn from_query(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.kind() {
                ErrorKind::UniqueViolation => return DatabaseError::UniqueViolation(constraint),
                ErrorKind::CheckViolation => return DatabaseError::CheckViolation(constraint),
                _ => {}
            }
        }
        DatabaseError::Query(err)
    }

    /// Name of the violated constraint, if this is a constraint violation
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DatabaseError::UniqueViolation(name) | DatabaseError::CheckViolation(name) => {
                Some(name.as_str())
            }
            _ => None,
        }
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::from_query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_stays_a_query_error() {
        let err = DatabaseError::from_query(SqlxError::RowNotFound);
        assert!(matches!(err, DatabaseError::Query(SqlxError::RowNotFound)));
        assert_eq!(err.constraint(), None);
    }

    #[test]
    fn constraint_name_is_exposed() {
        let err = DatabaseError::UniqueViolation("reviews_user_book_key".to_string());
        assert_eq!(err.constraint(), Some("reviews_user_book_key"));

        let err = DatabaseError::CheckViolation("books_copies_check".to_string());
        assert_eq!(err.constraint(), Some("books_copies_check"));
    }
}
