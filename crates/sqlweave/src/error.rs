//! Error types for sqlweave

use thiserror::Error;

/// Result type alias for sqlweave operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Reasons a statement cannot be rendered.
///
/// These are detected when the statement is built, never while it is being
/// configured: configuration calls always succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidStatement {
    /// The statement has no table to operate on
    #[error("no table specified")]
    NoTable,

    /// An INSERT has neither columns/values nor a source SELECT
    #[error("no values to insert")]
    NoValues,

    /// An UPDATE has no SET assignments
    #[error("no updates provided")]
    NoUpdates,

    /// A WITH statement has no main statement
    #[error("WITH statement has no main statement")]
    NoMainStatement,
}

/// Error types for building and executing statements
#[derive(Debug, Error)]
pub enum SqlError {
    /// Statement could not be rendered
    #[error("Invalid statement: {0}")]
    Invalid(#[from] InvalidStatement),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Beginning or committing a transaction failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The transaction body failed and the rollback failed too.
    ///
    /// `source` is the error returned by the transaction body.
    #[error("{source} (rollback failed: {rollback})")]
    Rollback {
        source: Box<SqlError>,
        rollback: Box<SqlError>,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqlError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a render-time error
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific SqlError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for SqlError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_statement_messages() {
        assert_eq!(InvalidStatement::NoTable.to_string(), "no table specified");
        assert_eq!(InvalidStatement::NoUpdates.to_string(), "no updates provided");

        let err: SqlError = InvalidStatement::NoValues.into();
        assert!(err.is_invalid());
        assert_eq!(err.to_string(), "Invalid statement: no values to insert");
    }

    #[test]
    fn rollback_error_keeps_both_messages() {
        let err = SqlError::Rollback {
            source: Box::new(SqlError::not_found("user 7")),
            rollback: Box::new(SqlError::Connection("socket closed".into())),
        };
        assert_eq!(
            err.to_string(),
            "Not found: user 7 (rollback failed: Connection error: socket closed)"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
