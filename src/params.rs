//! sea-query `Values` → `may_postgres` parameters.
//!
//! Statements are built once with `PostgresQueryBuilder`; the resulting values
//! are boxed as `ToSql` trait objects and borrowed for the duration of the
//! driver call.

use crate::error::StoreError;
use may_postgres::types::ToSql;
use sea_query::{Value, Values};

fn to_param(value: &Value) -> Result<Box<dyn ToSql>, StoreError> {
    let param: Box<dyn ToSql> = match value {
        Value::Bool(v) => Box::new(*v),
        Value::TinyInt(v) => Box::new(v.map(i16::from)),
        Value::SmallInt(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::BigInt(v) => Box::new(*v),
        Value::TinyUnsigned(v) => Box::new(v.map(i16::from)),
        Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
        Value::Unsigned(v) => Box::new(v.map(i64::from)),
        Value::BigUnsigned(v) => {
            let converted = match v {
                Some(u) => Some(i64::try_from(*u).map_err(|_| {
                    StoreError::Query(format!("BigUnsigned value {u} exceeds i64::MAX"))
                })?),
                None => None,
            };
            Box::new(converted)
        }
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::String(v) => Box::new(v.clone()),
        Value::Bytes(v) => Box::new(v.clone()),
        Value::Json(v) => {
            let encoded = match v {
                Some(json) => Some(serde_json::to_string(&**json).map_err(|e| {
                    StoreError::Query(format!("Failed to serialize JSON parameter: {e}"))
                })?),
                None => None,
            };
            Box::new(encoded)
        }
        other => {
            return Err(StoreError::Query(format!(
                "Unsupported value type in query: {other:?}"
            )))
        }
    };
    Ok(param)
}

/// Convert `values` and run `f` with the borrowed parameter slice.
pub fn with_params<F, R>(values: &Values, f: F) -> Result<R, StoreError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, StoreError>,
{
    let boxed = values
        .iter()
        .map(to_param)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = boxed.iter().map(|p| &**p).collect();
    f(&params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_every_bound_value() {
        let values = Values(vec![
            Value::from(1i64),
            Value::from("alpha"),
            Value::Bool(None),
            Value::from(3i32),
        ]);
        let count = with_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_empty_values() {
        let count = with_params(&Values(vec![]), |params| Ok(params.len())).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_big_unsigned_overflow_rejected() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        let result = with_params(&values, |_| Ok(()));
        assert!(matches!(result, Err(StoreError::Query(msg)) if msg.contains("exceeds")));
    }
}
