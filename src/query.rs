//! Entity-typed select queries.
//!
//! A [`Query`] keeps its filter, row range, ordering and projection apart and
//! only composes them into a `SelectStatement` when it is built. That lets the
//! query manager rewrite one part (say, drop the range for a count) without
//! touching the others.

use crate::entity::Persistable;
use crate::error::StoreError;
use crate::executor::Executor;
use crate::request::{OrderDirection, RowRange};
use sea_query::{
    Expr, ExprTrait, Func, Iden, IntoCondition, Order, PostgresQueryBuilder, SelectStatement,
    Values,
};
use std::fmt;
use std::marker::PhantomData;

/// Alias of the count column produced by [`Query::project_count`].
pub const COUNT_ALIAS: &str = "total";

/// A static identifier: table, column or alias name.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Name(pub &'static str);

impl Iden for Name {
    fn unquoted(&self) -> &str {
        self.0
    }
}

/// A single sort clause on a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortClause {
    field: &'static str,
    column: &'static str,
    descending: bool,
}

impl SortClause {
    pub fn ascending(field: &'static str, column: &'static str) -> Self {
        Self {
            field,
            column,
            descending: false,
        }
    }

    pub fn descending(field: &'static str, column: &'static str) -> Self {
        Self {
            field,
            column,
            descending: true,
        }
    }

    /// `None` for [`OrderDirection::Unspecified`].
    pub fn with_direction(
        field: &'static str,
        column: &'static str,
        direction: OrderDirection,
    ) -> Option<Self> {
        match direction {
            OrderDirection::Ascending => Some(Self::ascending(field, column)),
            OrderDirection::Descending => Some(Self::descending(field, column)),
            OrderDirection::Unspecified => None,
        }
    }

    fn order(&self) -> Order {
        if self.descending {
            Order::Desc
        } else {
            Order::Asc
        }
    }
}

impl fmt::Display for SortClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.descending { "desc" } else { "asc" };
        write!(f, "{} {direction}", self.field)
    }
}

/// What a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// The entity's declared columns.
    #[default]
    Entity,
    /// A single `COUNT(id) AS total` column.
    Count,
}

/// A select over `E`'s table.
///
/// # Examples
///
/// ```
/// use tidepool::{Query, Team};
///
/// let mut query = Query::<Team>::filtered("name LIKE 'Sec%'");
/// query.set_range(0, 25);
/// let (sql, _values) = query.build();
/// assert!(sql.starts_with("SELECT"));
/// ```
pub struct Query<E: Persistable> {
    select: SelectStatement,
    range: Option<RowRange>,
    ordering: Option<SortClause>,
    projection: Projection,
    _entity: PhantomData<E>,
}

impl<E: Persistable> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            select: self.select.clone(),
            range: self.range,
            ordering: self.ordering,
            projection: self.projection,
            _entity: PhantomData,
        }
    }
}

impl<E: Persistable> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("table", &E::TABLE)
            .field("range", &self.range)
            .field("ordering", &self.ordering)
            .field("projection", &self.projection)
            .finish()
    }
}

impl<E: Persistable> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Persistable> Query<E> {
    /// Unfiltered query over every row of `E`.
    pub fn new() -> Self {
        let mut select = SelectStatement::default();
        select.from(Name(E::TABLE));
        Self {
            select,
            range: None,
            ordering: None,
            projection: Projection::Entity,
            _entity: PhantomData,
        }
    }

    /// Query restricted by a raw SQL predicate.
    ///
    /// The predicate is inserted verbatim; it must come from trusted code, not
    /// from request input.
    pub fn filtered(predicate: impl Into<String>) -> Self {
        let mut query = Self::new();
        query.select.and_where(Expr::cust(predicate.into()));
        query
    }

    /// Query for the row whose primary key is `id`.
    pub fn by_id(id: i64) -> Self {
        let mut query = Self::new();
        query.filter(Expr::col(Name(E::ID_COLUMN)).eq(id));
        query
    }

    /// AND a typed condition onto the filter.
    pub fn filter<C: IntoCondition>(&mut self, condition: C) -> &mut Self {
        self.select.cond_where(condition.into_condition());
        self
    }

    /// Restrict results to rows `[start, end)`.
    pub fn set_range(&mut self, start: u64, end: u64) -> &mut Self {
        self.range = Some(RowRange::new(start, end));
        self
    }

    pub fn clear_range(&mut self) -> &mut Self {
        self.range = None;
        self
    }

    pub fn range(&self) -> Option<RowRange> {
        self.range
    }

    pub fn set_ordering(&mut self, clause: SortClause) -> &mut Self {
        self.ordering = Some(clause);
        self
    }

    pub fn clear_ordering(&mut self) -> &mut Self {
        self.ordering = None;
        self
    }

    pub fn ordering(&self) -> Option<&SortClause> {
        self.ordering.as_ref()
    }

    /// Return `COUNT(id) AS total` instead of entity columns.
    pub fn project_count(&mut self) -> &mut Self {
        self.projection = Projection::Count;
        self
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Copy of this query that counts every matching row: same filter, no
    /// range, no ordering.
    pub fn to_count_query(&self) -> Self {
        let mut count = self.clone();
        count.project_count().clear_ordering().clear_range();
        count
    }

    /// Compose the final statement.
    pub fn statement(&self) -> SelectStatement {
        let mut select = self.select.clone();
        match self.projection {
            Projection::Entity => {
                select.columns(E::COLUMNS.iter().map(|column| Name(*column)));
            }
            Projection::Count => {
                select.expr_as(Func::count(Expr::col(Name(E::ID_COLUMN))), Name(COUNT_ALIAS));
            }
        }
        if let Some(clause) = &self.ordering {
            select.order_by(Name(clause.column), clause.order());
        }
        if let Some(range) = self.range {
            select.limit(range.len()).offset(range.start);
        }
        select
    }

    /// SQL with `$n` placeholders and the values bound to them.
    pub fn build(&self) -> (String, Values) {
        self.statement().build(PostgresQueryBuilder)
    }

    /// Run the query and decode every row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails or a row cannot be decoded.
    pub fn all<X: Executor>(&self, executor: &X) -> Result<Vec<E>, StoreError> {
        let (sql, values) = self.build();
        executor
            .query_all(&sql, &values)?
            .iter()
            .map(E::from_row)
            .collect()
    }

    /// Run the query and decode the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails or the row cannot be decoded.
    pub fn one<X: Executor>(&self, executor: &X) -> Result<Option<E>, StoreError> {
        let (sql, values) = self.build();
        executor
            .query_first(&sql, &values)?
            .as_ref()
            .map(E::from_row)
            .transpose()
    }
}
