//! Scripted executor for tests.
//!
//! [`MockExecutor`] records every statement (SQL and bound values), answers
//! queries from a queue of prepared result sets and fails any statement whose
//! SQL contains a registered fragment. Clones share state, so a test can keep
//! a handle after moving the executor into a `QueryManager`.

use crate::error::StoreError;
use crate::executor::Executor;
use crate::row::DataRow;
use sea_query::{Value, Values};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A captured statement.
#[derive(Debug, Clone)]
pub struct CapturedStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

/// An in-memory row, built column by column.
#[derive(Debug, Clone, Default)]
pub struct MockRow {
    columns: Vec<(String, Value)>,
}

impl MockRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.columns.push((column.to_string(), value.into()));
        self
    }
}

impl DataRow for MockRow {
    fn value(&self, column: &str) -> Result<Value, StoreError> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| StoreError::Decode(format!("column `{column}` not present in row")))
    }
}

#[derive(Default)]
struct MockState {
    statements: Vec<CapturedStatement>,
    results: VecDeque<Vec<MockRow>>,
    failures: Vec<String>,
    close_calls: usize,
}

#[derive(Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the statements captured so far.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the rows returned by the next query.
    pub fn push_result(&self, rows: Vec<MockRow>) -> &Self {
        self.state().results.push_back(rows);
        self
    }

    /// Fail every statement whose SQL contains `fragment`.
    pub fn fail_when(&self, fragment: &str) -> &Self {
        self.state().failures.push(fragment.to_string());
        self
    }

    pub fn statements(&self) -> Vec<CapturedStatement> {
        self.state().statements.clone()
    }

    pub fn captured_sql(&self) -> Vec<String> {
        self.state().statements.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    fn record(&self, sql: &str, values: &Values) -> Result<(), StoreError> {
        let mut state = self.state();
        state.statements.push(CapturedStatement {
            sql: sql.to_string(),
            values: values.iter().cloned().collect(),
        });
        if state.failures.iter().any(|fragment| sql.contains(fragment.as_str())) {
            return Err(StoreError::Query(format!("injected failure for `{sql}`")));
        }
        Ok(())
    }
}

impl Executor for MockExecutor {
    type Row = MockRow;

    fn execute(&self, sql: &str, values: &Values) -> Result<u64, StoreError> {
        self.record(sql, values)?;
        Ok(1)
    }

    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<MockRow>, StoreError> {
        self.record(sql, values)?;
        Ok(self.state().results.pop_front().unwrap_or_default())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.state().close_calls += 1;
        Ok(())
    }
}
