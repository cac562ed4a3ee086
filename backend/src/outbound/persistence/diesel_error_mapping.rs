//! Shared classification of Diesel and pool failures.
//!
//! Repositories turn a [`StoreFailure`] into their own port error, so the
//! Diesel-specific inspection lives in one place.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Adapter-neutral failure category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFailure {
    Connection(String),
    Duplicate(String),
    Query(String),
}

pub(crate) fn classify_pool_error(error: PoolError) -> StoreFailure {
    StoreFailure::Connection(error.into_message())
}

/// Classify a Diesel error; full detail is only logged at debug level.
pub(crate) fn classify_diesel_error(error: DieselError, operation: &str) -> StoreFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(%error, %operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreFailure::Duplicate(info.constraint_name().unwrap_or("primary key").to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreFailure::Connection("database connection error".to_owned())
        }
        DieselError::DeserializationError(err) => {
            StoreFailure::Query(format!("{operation}: stored row is invalid: {err}"))
        }
        DieselError::NotFound => StoreFailure::Query(format!("{operation}: record not found")),
        _ => StoreFailure::Query(format!("{operation}: database error")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_failures_are_connection_failures() {
        assert_eq!(
            classify_pool_error(PoolError::checkout("timed out")),
            StoreFailure::Connection("timed out".to_owned())
        );
    }

    #[rstest]
    fn not_found_is_a_query_failure() {
        assert_eq!(
            classify_diesel_error(DieselError::NotFound, "find user"),
            StoreFailure::Query("find user: record not found".to_owned())
        );
    }

    #[rstest]
    fn deserialisation_failures_name_the_operation() {
        let failure = classify_diesel_error(
            DieselError::DeserializationError("bad role".into()),
            "list users",
        );
        assert!(matches!(failure, StoreFailure::Query(message) if message.contains("bad role")));
    }
}
