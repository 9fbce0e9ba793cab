//! Statement execution.
//!
//! [`Executor`] is the seam between the query manager and the store. The
//! manager builds statements with sea-query and hands the SQL plus bound
//! values to an executor; [`PgExecutor`] runs them over `may_postgres`.

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::params::with_params;
use crate::row::DataRow;
use may_postgres::{Client, Row};
use sea_query::Values;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// A single store session able to run SQL statements.
///
/// Executors are used from one unit of work at a time; nothing here is
/// required to be `Sync`.
///
/// # Examples
///
/// ```no_run
/// use tidepool::{DatabaseConfig, Executor, PgExecutor, StoreError};
/// use sea_query::Values;
///
/// # fn main() -> Result<(), StoreError> {
/// let executor = PgExecutor::connect(&DatabaseConfig::default())?;
/// let affected = executor.execute("DELETE FROM apikeys_teams", &Values(vec![]))?;
/// # Ok(())
/// # }
/// ```
pub trait Executor {
    /// Row type returned by queries.
    type Row: DataRow;

    /// Run a statement and return the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the statement fails.
    fn execute(&self, sql: &str, values: &Values) -> Result<u64, StoreError>;

    /// Run a query and return every row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Self::Row>, StoreError>;

    /// Run a query and return its first row, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    fn query_first(&self, sql: &str, values: &Values) -> Result<Option<Self::Row>, StoreError> {
        Ok(self.query_all(sql, values)?.into_iter().next())
    }

    /// Release the session. Called exactly once by the owning manager.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store rejects the release.
    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// `may_postgres`-backed executor. Owns one client connection.
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    /// Wrap an already-connected client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Open a new session using `config`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the connection string is invalid or
    /// the server cannot be reached.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let client = crate::connection::connect(&config.connection_string())?;
        Ok(Self::new(client))
    }

    fn observe<T>(result: Result<T, may_postgres::Error>, started: Instant) -> Result<T, StoreError> {
        #[cfg(feature = "metrics")]
        METRICS.record_query(started.elapsed(), result.is_err());
        #[cfg(not(feature = "metrics"))]
        let _ = started;
        result.map_err(StoreError::from)
    }
}

impl Executor for PgExecutor {
    type Row = Row;

    fn execute(&self, sql: &str, values: &Values) -> Result<u64, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        with_params(values, |params| {
            let started = Instant::now();
            Self::observe(self.client.execute(sql, params), started)
        })
    }

    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        with_params(values, |params| {
            let started = Instant::now();
            Self::observe(self.client.query(sql, params), started)
        })
    }

    fn close(&mut self) -> Result<(), StoreError> {
        // The connection is torn down when the client is dropped with the executor.
        log::debug!("releasing postgres session");
        Ok(())
    }
}
