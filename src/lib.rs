//! # Tidepool
//!
//! Request-scoped query manager over PostgreSQL, running on `may_postgres`.
//!
//! A [`QueryManager`] owns one session and one [`RequestContext`]. Read
//! queries handed to it are paginated and ordered from the context, with
//! order-by input checked against each entity's sortable fields. Counting,
//! transactional deletes and id/uuid lookups share the same session.

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod executor;
pub mod manager;
pub mod metrics;
pub mod model;
pub mod params;
pub mod query;
pub mod request;
pub mod row;
pub mod transaction;
pub mod validation;
pub mod value;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::DatabaseConfig;
pub use entity::{Persistable, UuidIdentified};
pub use error::{ConnectionError, StoreError};
pub use executor::{Executor, PgExecutor};
pub use manager::QueryManager;
pub use model::{ApiKey, FetchGroup, LdapUser, ManagedUser, Team};
pub use query::{Projection, Query, SortClause};
pub use request::{OrderDirection, Pagination, Principal, RequestContext, RowRange};
pub use row::DataRow;
pub use transaction::Transaction;
pub use validation::ValidationError;
pub use value::{TryGetable, ValueError};
