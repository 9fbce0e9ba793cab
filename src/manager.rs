//! Request-scoped query manager.
//!
//! A [`QueryManager`] is created for one unit of work. It owns a single store
//! session and a [`RequestContext`], and applies the context's pagination and
//! ordering to every read it executes. Counting, deleting and identifier
//! lookups go through the same session.
//!
//! The session is released by [`QueryManager::close`], by dropping the
//! manager, or at the end of [`QueryManager::scoped`].

use crate::config::DatabaseConfig;
use crate::entity::{Persistable, UuidIdentified};
use crate::error::StoreError;
use crate::executor::{Executor, PgExecutor};
use crate::query::{Name, Query, SortClause};
use crate::request::RequestContext;
use crate::row::DataRow;
use crate::transaction::Transaction;
use crate::validation;
use sea_query::{Expr, ExprTrait, PostgresQueryBuilder, Query as Statement};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Query manager bound to one request and one session.
///
/// # Examples
///
/// ```no_run
/// use tidepool::{DatabaseConfig, OrderDirection, Pagination, Query, QueryManager, RequestContext, Team};
///
/// # fn main() -> Result<(), tidepool::StoreError> {
/// let ctx = RequestContext::new(
///     None,
///     Pagination::new(1, 25),
///     None,
///     Some("name".to_string()),
///     OrderDirection::Ascending,
/// );
/// let qm = QueryManager::connect(ctx, &DatabaseConfig::default())?;
/// let mut query = Query::<Team>::new();
/// let total = qm.count(&query)?;
/// let first_page = qm.execute(&mut query)?;
/// # Ok(())
/// # }
/// ```
#[must_use = "a query manager holds a session until it is closed or dropped"]
pub struct QueryManager<X: Executor = PgExecutor> {
    context: RequestContext,
    session: Option<X>,
    fetch_plan: Vec<String>,
}

impl QueryManager<PgExecutor> {
    /// Open a new postgres session for `context`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the session cannot be opened.
    pub fn connect(context: RequestContext, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let executor = PgExecutor::connect(config)?;
        Ok(Self::new(context, executor))
    }
}

impl<X: Executor> QueryManager<X> {
    pub fn new(context: RequestContext, executor: X) -> Self {
        Self {
            context,
            session: Some(executor),
            fetch_plan: Vec::new(),
        }
    }

    /// Manager with an empty context: unpaginated, unordered, unfiltered.
    pub fn with_defaults(executor: X) -> Self {
        Self::new(RequestContext::default(), executor)
    }

    /// Run `f` with a fresh manager and close it afterwards, whatever `f`
    /// returns. A close failure is reported only when `f` succeeded.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or from closing the session.
    pub fn scoped<F, R>(context: RequestContext, executor: X, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Self) -> Result<R, StoreError>,
    {
        let mut manager = Self::new(context, executor);
        let result = f(&mut manager);
        let closed = manager.close();
        match result {
            Ok(value) => closed.map(|()| value),
            Err(e) => {
                if let Err(close_err) = closed {
                    log::warn!("failed to close session after error: {close_err}");
                }
                Err(e)
            }
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    fn session(&self) -> Result<&X, StoreError> {
        self.session.as_ref().ok_or(StoreError::Closed)
    }

    /// Add a named fetch group. Groups stay active until the manager closes.
    pub fn add_fetch_group(&mut self, group: impl AsRef<str>) -> &mut Self {
        let group = group.as_ref();
        if !self.fetch_plan.iter().any(|g| g == group) {
            self.fetch_plan.push(group.to_string());
        }
        self
    }

    pub fn fetch_plan(&self) -> &[String] {
        &self.fetch_plan
    }

    /// Apply the context's pagination and ordering to `query`.
    ///
    /// An order-by field is honored only when it is alphanumeric, names one of
    /// `E`'s sortable fields and comes with a direction. Anything else leaves
    /// the query unordered.
    pub fn decorate<'q, E: Persistable>(&self, query: &'q mut Query<E>) -> &'q mut Query<E> {
        if let Some(range) = self.context.pagination().range() {
            if range.is_empty() {
                log::debug!("page {:?} lies past the last addressable row", self.context.pagination());
            }
            query.set_range(range.start, range.end);
        }
        if let Some(clause) = self.sort_clause::<E>() {
            query.set_ordering(clause);
        }
        query
    }

    fn sort_clause<E: Persistable>(&self) -> Option<SortClause> {
        let field = self.context.order_by()?;
        if !validation::is_alpha_numeric(field) {
            log::debug!("ignoring order-by {field:?}: not alphanumeric");
            return None;
        }
        let Some((name, column)) = E::sortable_column(field) else {
            log::debug!("ignoring order-by {field:?}: not a sortable field of {}", E::TABLE);
            return None;
        };
        SortClause::with_direction(name, column, self.context.order_direction())
    }

    /// Decorate and run `query`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise any store error.
    pub fn execute<E: Persistable>(&self, query: &mut Query<E>) -> Result<Vec<E>, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::manager_span("execute", E::TABLE).entered();

        let session = self.session()?;
        let mut entities = self.decorate(query).all(session)?;
        for entity in &mut entities {
            self.apply_fetch_plan(entity, session)?;
        }
        Ok(entities)
    }

    /// Decorate and run `query`, keeping only the first row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise any store error.
    pub fn execute_first<E: Persistable>(&self, query: &mut Query<E>) -> Result<Option<E>, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::manager_span("execute_first", E::TABLE).entered();

        let session = self.session()?;
        let entity = self.decorate(query).one(session)?;
        self.finish_lookup(entity, session)
    }

    /// Number of rows `query` matches, ignoring its range and ordering.
    /// `query` itself is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise any store error.
    pub fn count<E: Persistable>(&self, query: &Query<E>) -> Result<u64, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::manager_span("count", E::TABLE).entered();

        let session = self.session()?;
        let (sql, values) = query.to_count_query().build();
        let row = session
            .query_first(&sql, &values)?
            .ok_or_else(|| StoreError::Decode("count query returned no rows".to_string()))?;
        row.get::<u64>(crate::query::COUNT_ALIAS)
    }

    /// Total rows of `E`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise any store error.
    pub fn count_all<E: Persistable>(&self) -> Result<u64, StoreError> {
        self.count(&Query::<E>::new())
    }

    /// Delete `entities` and the join rows that reference them in one
    /// transaction. Nothing is deleted if any statement fails.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise the first store
    /// error; the transaction has been rolled back by then.
    pub fn delete<E: Persistable>(&self, entities: &[E]) -> Result<(), StoreError> {
        if entities.is_empty() {
            return Ok(());
        }
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::manager_span("delete", E::TABLE).entered();

        let session = self.session()?;
        let ids: Vec<i64> = entities.iter().map(Persistable::id).collect();

        let tx = Transaction::begin(session)?;
        match Self::delete_rows::<E>(&tx, &ids) {
            Ok(()) => tx.commit(),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::warn!("rollback after failed delete also failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    fn delete_rows<E: Persistable>(tx: &Transaction<'_, X>, ids: &[i64]) -> Result<(), StoreError> {
        let dependents = E::DEPENDENT_TABLES.iter().copied();
        for (table, column) in dependents.chain(std::iter::once((E::TABLE, E::ID_COLUMN))) {
            let (sql, values) = Statement::delete()
                .from_table(Name(table))
                .and_where(Expr::col(Name(column)).is_in(ids.iter().copied()))
                .build(PostgresQueryBuilder);
            tx.execute(&sql, &values)?;
        }
        Ok(())
    }

    /// Entity whose primary key is `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise any store error.
    pub fn get_by_id<E: Persistable>(&self, id: i64) -> Result<Option<E>, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::manager_span("get_by_id", E::TABLE).entered();

        let session = self.session()?;
        let entity = Query::<E>::by_id(id).one(session)?;
        self.finish_lookup(entity, session)
    }

    /// Entity whose uuid is `uuid`. The first row wins if several match.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise any store error.
    pub fn get_by_uuid<E: UuidIdentified>(&self, uuid: &str) -> Result<Option<E>, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::manager_span("get_by_uuid", E::TABLE).entered();

        let session = self.session()?;
        let mut query = Query::<E>::new();
        query.filter(Expr::col(Name(E::UUID_COLUMN)).eq(uuid));
        let entity = query.one(session)?;
        self.finish_lookup(entity, session)
    }

    /// Like [`get_by_uuid`](Self::get_by_uuid), adding `fetch_group` to the
    /// fetch plan first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` after `close`, otherwise any store error.
    pub fn get_by_uuid_with_fetch_group<E: UuidIdentified>(
        &mut self,
        uuid: &str,
        fetch_group: impl AsRef<str>,
    ) -> Result<Option<E>, StoreError> {
        self.add_fetch_group(fetch_group);
        self.get_by_uuid(uuid)
    }

    fn finish_lookup<E: Persistable>(&self, entity: Option<E>, session: &X) -> Result<Option<E>, StoreError> {
        entity
            .map(|mut entity| {
                self.apply_fetch_plan(&mut entity, session)?;
                Ok(entity)
            })
            .transpose()
    }

    fn apply_fetch_plan<E: Persistable>(&self, entity: &mut E, session: &X) -> Result<(), StoreError> {
        for group in self.fetch_plan.iter().filter(|g| E::declares_fetch_group(g)) {
            entity.load_fetch_group(group, session)?;
        }
        Ok(())
    }

    /// Release the session. Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if releasing the session fails; the
    /// manager counts as closed either way.
    pub fn close(&mut self) -> Result<(), StoreError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        log::debug!("closing query manager session");
        #[cfg(feature = "metrics")]
        METRICS.record_session_closed();
        session.close()
    }
}

impl<X: Executor> Drop for QueryManager<X> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close query manager session: {e}");
        }
    }
}
