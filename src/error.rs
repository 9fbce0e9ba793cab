//! Error types shared by the executor, transaction and manager layers.
//!
//! Store-level failures are propagated to the caller unchanged: this crate adds
//! no retry and no translation beyond wrapping the driver error in
//! [`StoreError::Postgres`].

use may_postgres::Error as PostgresError;
use std::fmt;

/// Error returned by every store-facing operation.
#[derive(Debug)]
pub enum StoreError {
    /// `PostgreSQL` error from `may_postgres`
    Postgres(PostgresError),
    /// The session could not be opened
    Connection(ConnectionError),
    /// Statement execution error (raised by non-postgres executors)
    Query(String),
    /// A row could not be decoded into the requested entity
    Decode(String),
    /// A transaction was used after commit/rollback
    Transaction(String),
    /// The query manager (or its session) has already been closed
    Closed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Postgres(e) => write!(f, "PostgreSQL error: {e}"),
            StoreError::Connection(e) => write!(f, "Connection error: {e}"),
            StoreError::Query(s) => write!(f, "Query error: {s}"),
            StoreError::Decode(s) => write!(f, "Decode error: {s}"),
            StoreError::Transaction(s) => write!(f, "Transaction error: {s}"),
            StoreError::Closed => write!(f, "Query manager session is closed"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Postgres(e) => Some(e),
            StoreError::Connection(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        StoreError::Postgres(err)
    }
}

impl From<ConnectionError> for StoreError {
    fn from(err: ConnectionError) -> Self {
        StoreError::Connection(err)
    }
}

impl From<crate::value::ValueError> for StoreError {
    fn from(err: crate::value::ValueError) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Failure to open a session.
#[derive(Debug)]
pub enum ConnectionError {
    /// The connection string is not a postgres URI or key-value string
    InvalidConnectionString(String),
    /// Network/authentication error from `may_postgres`
    Postgres(PostgresError),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidConnectionString(s) => {
                write!(f, "Invalid connection string: {s}")
            }
            ConnectionError::Postgres(e) => write!(f, "PostgreSQL error: {e}"),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Postgres(e) => Some(e),
            ConnectionError::InvalidConnectionString(_) => None,
        }
    }
}

impl From<PostgresError> for ConnectionError {
    fn from(err: PostgresError) -> Self {
        ConnectionError::Postgres(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_store_error_display() {
        assert!(StoreError::Query("boom".into()).to_string().contains("Query error: boom"));
        assert!(StoreError::Decode("bad row".into()).to_string().contains("Decode error"));
        assert!(StoreError::Transaction("done".into()).to_string().contains("Transaction error"));
        assert_eq!(StoreError::Closed.to_string(), "Query manager session is closed");
    }

    #[test]
    fn test_connection_error_converts_and_keeps_source() {
        let err: StoreError = ConnectionError::InvalidConnectionString("empty".into()).into();
        assert!(err.to_string().contains("Invalid connection string: empty"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_value_error_becomes_decode() {
        let err: StoreError = crate::value::ValueError::Null("name".into()).into();
        assert!(matches!(err, StoreError::Decode(msg) if msg.contains("name")));
    }
}
