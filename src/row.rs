//! Backend-neutral row access.
//!
//! Entity decoders read columns by name through [`DataRow`], so the same
//! `Persistable::from_row` works for `may_postgres::Row` and for the rows a
//! test executor hands back.

use crate::error::StoreError;
use crate::value::TryGetable;
use may_postgres::types::Type;
use may_postgres::Row;
use sea_query::Value;

/// A single result row, addressable by column name.
pub trait DataRow {
    /// Raw value of `column`. Missing columns are a decode error.
    fn value(&self, column: &str) -> Result<Value, StoreError>;

    /// Typed, non-null value of `column`.
    fn get<T: TryGetable>(&self, column: &str) -> Result<T, StoreError> {
        T::try_get(self.value(column)?)
            .map_err(|e| StoreError::Decode(format!("column `{column}`: {e}")))
    }

    /// Typed value of `column`, `None` when NULL.
    fn get_opt<T: TryGetable>(&self, column: &str) -> Result<Option<T>, StoreError> {
        T::try_get_opt(self.value(column)?)
            .map_err(|e| StoreError::Decode(format!("column `{column}`: {e}")))
    }
}

impl DataRow for Row {
    fn value(&self, column: &str) -> Result<Value, StoreError> {
        let idx = self
            .columns()
            .iter()
            .position(|c| c.name() == column)
            .ok_or_else(|| StoreError::Decode(format!("column `{column}` not present in row")))?;
        let ty = self.columns()[idx].type_();

        let value = if *ty == Type::BOOL {
            Value::from(self.try_get::<_, Option<bool>>(idx)?)
        } else if *ty == Type::INT2 {
            Value::from(self.try_get::<_, Option<i16>>(idx)?)
        } else if *ty == Type::INT4 {
            Value::from(self.try_get::<_, Option<i32>>(idx)?)
        } else if *ty == Type::INT8 {
            Value::from(self.try_get::<_, Option<i64>>(idx)?)
        } else if *ty == Type::FLOAT8 {
            Value::from(self.try_get::<_, Option<f64>>(idx)?)
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
        {
            Value::from(self.try_get::<_, Option<String>>(idx)?)
        } else if *ty == Type::BYTEA {
            Value::from(self.try_get::<_, Option<Vec<u8>>>(idx)?)
        } else {
            return Err(StoreError::Decode(format!(
                "column `{column}` has unsupported type {ty}"
            )));
        };
        Ok(value)
    }
}
