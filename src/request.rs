//! Per-request query parameters.
//!
//! A [`RequestContext`] carries who is asking (principal), which page they
//! want, an optional filter and the requested ordering. It is fixed for the
//! lifetime of the query manager it is handed to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Largest row offset the server accepts (`LIMIT`/`OFFSET` are BIGINT).
pub const MAX_ROW: u64 = i64::MAX as u64;

/// Half-open row range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u64,
    pub end: u64,
}

impl RowRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 1-based page number and page size. Zero in either field means unpaginated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub size: u64,
}

impl Pagination {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    pub fn unpaginated() -> Self {
        Self::default()
    }

    /// Lenient parse of raw request values; anything that is not a
    /// non-negative integer counts as 0.
    pub fn parse(page: Option<&str>, size: Option<&str>) -> Self {
        let number = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(0);
        Self::new(number(page), number(size))
    }

    pub fn is_paginated(&self) -> bool {
        self.page > 0 && self.size > 0
    }

    /// Rows covered by this page: `[(page-1)*size, (page-1)*size + size)`.
    ///
    /// A page starting past [`MAX_ROW`] yields the empty range
    /// `[MAX_ROW, MAX_ROW)`; a page straddling it ends at `MAX_ROW`.
    pub fn range(&self) -> Option<RowRange> {
        if !self.is_paginated() {
            return None;
        }
        let start = (self.page - 1)
            .checked_mul(self.size)
            .filter(|start| *start <= MAX_ROW);
        let Some(start) = start else {
            return Some(RowRange::new(MAX_ROW, MAX_ROW));
        };
        let end = start.checked_add(self.size).map_or(MAX_ROW, |end| end.min(MAX_ROW));
        Some(RowRange::new(start, end))
    }
}

/// Requested sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Ascending,
    Descending,
    #[default]
    Unspecified,
}

impl OrderDirection {
    /// Lower-case keyword used in sort clauses; `None` when unspecified.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            OrderDirection::Ascending => Some("asc"),
            OrderDirection::Descending => Some("desc"),
            OrderDirection::Unspecified => None,
        }
    }
}

impl FromStr for OrderDirection {
    type Err = std::convert::Infallible;

    /// Unrecognised input is `Unspecified`, never an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let direction = match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => OrderDirection::Ascending,
            "desc" | "descending" => OrderDirection::Descending,
            _ => OrderDirection::Unspecified,
        };
        Ok(direction)
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().unwrap_or("unspecified"))
    }
}

/// Everything a query manager needs to know about the incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    principal: Option<Principal>,
    pagination: Pagination,
    filter: Option<String>,
    order_by: Option<String>,
    order_direction: OrderDirection,
}

impl RequestContext {
    pub fn new(
        principal: Option<Principal>,
        pagination: Pagination,
        filter: Option<String>,
        order_by: Option<String>,
        order_direction: OrderDirection,
    ) -> Self {
        Self {
            principal,
            pagination,
            filter,
            order_by,
            order_direction,
        }
    }

    /// Build a context from raw request parameters. Blank strings are treated
    /// as absent.
    pub fn from_params(
        principal: Option<Principal>,
        page: Option<&str>,
        size: Option<&str>,
        filter: Option<&str>,
        order_by: Option<&str>,
        order: Option<&str>,
    ) -> Self {
        let non_blank = |raw: Option<&str>| {
            raw.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let order_direction = order
            .map(|raw| raw.parse().unwrap_or_default())
            .unwrap_or_default();

        Self::new(
            principal,
            Pagination::parse(page, size),
            non_blank(filter),
            non_blank(order_by),
            order_direction,
        )
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn order_direction(&self) -> OrderDirection {
        self.order_direction
    }
}
