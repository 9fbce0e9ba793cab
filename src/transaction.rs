//! Transaction guard.
//!
//! A [`Transaction`] borrows an executor for its lifetime, issues `BEGIN` on
//! creation and must be finished with [`Transaction::commit`] or
//! [`Transaction::rollback`]. A guard dropped while still open issues
//! `ROLLBACK`, so an early `?` return inside a transaction leaves the session
//! clean. There is no savepoint support.

use crate::error::StoreError;
use crate::executor::Executor;
use sea_query::Values;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// An open top-level transaction on `X`.
///
/// # Examples
///
/// ```no_run
/// use tidepool::{DatabaseConfig, Executor, PgExecutor, StoreError, Transaction};
/// use sea_query::Values;
///
/// # fn main() -> Result<(), StoreError> {
/// let executor = PgExecutor::connect(&DatabaseConfig::default())?;
/// let tx = Transaction::begin(&executor)?;
/// tx.execute("DELETE FROM apikeys_teams WHERE team_id = 1", &Values(vec![]))?;
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
#[must_use = "a transaction is rolled back when dropped without commit"]
pub struct Transaction<'a, X: Executor> {
    executor: &'a X,
    closed: bool,
}

impl<'a, X: Executor> Transaction<'a, X> {
    /// Start a transaction on `executor`.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if `BEGIN` fails.
    pub fn begin(executor: &'a X) -> Result<Self, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span().entered();

        executor.execute("BEGIN", &Values(Vec::new()))?;
        Ok(Self {
            executor,
            closed: false,
        })
    }

    /// Run a statement inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the executor's error; the transaction stays open so the caller
    /// (or `Drop`) can roll back.
    pub fn execute(&self, sql: &str, values: &Values) -> Result<u64, StoreError> {
        if self.closed {
            return Err(StoreError::Transaction("transaction is closed".to_string()));
        }
        self.executor.execute(sql, values)
    }

    /// Commit. If `COMMIT` itself fails the server discards the transaction's effects.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if `COMMIT` fails.
    pub fn commit(mut self) -> Result<(), StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::commit_transaction_span().entered();

        self.closed = true;
        self.executor.execute("COMMIT", &Values(Vec::new()))?;
        Ok(())
    }

    /// Roll back every statement run in this transaction.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if `ROLLBACK` fails.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.closed = true;
        Self::issue_rollback(self.executor)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn issue_rollback(executor: &X) -> Result<(), StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::rollback_transaction_span().entered();

        executor.execute("ROLLBACK", &Values(Vec::new()))?;
        Ok(())
    }
}

impl<X: Executor> Drop for Transaction<'_, X> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        log::warn!("transaction dropped without commit, rolling back");
        if let Err(e) = Self::issue_rollback(self.executor) {
            log::warn!("rollback on drop failed: {e}");
        }
    }
}
