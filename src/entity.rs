//! Persistent entity traits.
//!
//! An entity declares its table, the columns it is decoded from and a static
//! allowlist of sortable fields. The allowlist is what order-by input is
//! checked against; nothing is discovered at runtime.

use crate::error::StoreError;
use crate::executor::Executor;
use crate::row::DataRow;

/// A record stored in one table with a BIGINT primary key.
pub trait Persistable: Sized {
    /// Table name.
    const TABLE: &'static str;

    /// Primary key column.
    const ID_COLUMN: &'static str = "id";

    /// Columns selected when loading the entity.
    const COLUMNS: &'static [&'static str];

    /// `(field, column)` pairs a caller may sort by.
    const SORTABLE_FIELDS: &'static [(&'static str, &'static str)];

    /// Named groups of supplementary fields this entity can load.
    const FETCH_GROUPS: &'static [&'static str] = &[];

    /// `(table, foreign key column)` rows that reference this entity and must
    /// be removed before it.
    const DEPENDENT_TABLES: &'static [(&'static str, &'static str)] = &[];

    fn from_row<R: DataRow>(row: &R) -> Result<Self, StoreError>;

    fn id(&self) -> i64;

    /// Column backing a sortable field, if `field` is declared.
    fn sortable_column(field: &str) -> Option<(&'static str, &'static str)> {
        Self::SORTABLE_FIELDS
            .iter()
            .copied()
            .find(|(name, _)| *name == field)
    }

    fn declares_fetch_group(group: &str) -> bool {
        Self::FETCH_GROUPS.contains(&group)
    }

    /// Load the members of `group` using `executor`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a supplementary query fails.
    fn load_fetch_group<X: Executor>(&mut self, group: &str, executor: &X) -> Result<(), StoreError> {
        let _ = (group, executor);
        Ok(())
    }
}

/// An entity with a unique external identifier.
pub trait UuidIdentified: Persistable {
    const UUID_COLUMN: &'static str = "uuid";

    fn uuid(&self) -> &str;
}
