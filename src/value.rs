//! Typed extraction from `sea_query::Value`.
//!
//! Rows coming back from any executor are exposed as `sea_query::Value`s (see
//! [`crate::row::DataRow`]); entity decoders pull typed fields out of them with
//! [`TryGetable`].

use sea_query::Value;
use std::fmt;
use uuid::Uuid;

/// Why a value could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The column was NULL where a value was required
    Null(String),
    /// The stored value has a different type than requested
    TypeMismatch { expected: &'static str, actual: String },
    /// The value has the right type but cannot be represented (overflow, bad format)
    Conversion(String),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::Null(column) => write!(f, "Column `{column}` is null"),
            ValueError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {expected}, got {actual}")
            }
            ValueError::Conversion(msg) => write!(f, "Conversion error: {msg}"),
        }
    }
}

impl std::error::Error for ValueError {}

/// Types that can be read out of a `sea_query::Value`.
///
/// `try_get` treats NULL as an error; `try_get_opt` maps NULL to `None`.
pub trait TryGetable: Sized {
    fn try_get(value: Value) -> Result<Self, ValueError>;

    fn try_get_opt(value: Value) -> Result<Option<Self>, ValueError> {
        match Self::try_get(value) {
            Ok(v) => Ok(Some(v)),
            Err(ValueError::Null(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn mismatch(expected: &'static str, actual: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        actual: format!("{actual:?}"),
    }
}

macro_rules! impl_try_getable {
    ($type:ty, $variant:ident, $expected:expr) => {
        impl TryGetable for $type {
            fn try_get(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(Some(v)) => Ok(v),
                    Value::$variant(None) => Err(ValueError::Null($expected.to_string())),
                    other => Err(mismatch($expected, &other)),
                }
            }
        }
    };
}

impl_try_getable!(bool, Bool, "Bool");
impl_try_getable!(i16, SmallInt, "SmallInt");
impl_try_getable!(f64, Double, "Double");
impl_try_getable!(String, String, "String");
impl_try_getable!(Vec<u8>, Bytes, "Bytes");

// Integer columns widen: INT2/INT4 read fine into i32 or i64.
impl TryGetable for i32 {
    fn try_get(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(Some(v)) => Ok(v),
            Value::SmallInt(Some(v)) => Ok(i32::from(v)),
            Value::BigInt(Some(v)) => i32::try_from(v)
                .map_err(|_| ValueError::Conversion(format!("{v} does not fit in i32"))),
            Value::Int(None) | Value::SmallInt(None) | Value::BigInt(None) => {
                Err(ValueError::Null("Int".to_string()))
            }
            other => Err(mismatch("Int", &other)),
        }
    }
}

impl TryGetable for i64 {
    fn try_get(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::BigInt(Some(v)) => Ok(v),
            Value::Int(Some(v)) => Ok(i64::from(v)),
            Value::SmallInt(Some(v)) => Ok(i64::from(v)),
            Value::BigInt(None) | Value::Int(None) | Value::SmallInt(None) => {
                Err(ValueError::Null("BigInt".to_string()))
            }
            other => Err(mismatch("BigInt", &other)),
        }
    }
}

// Counts come back as BIGINT; negative values are a driver bug, not a count.
impl TryGetable for u64 {
    fn try_get(value: Value) -> Result<Self, ValueError> {
        let signed = i64::try_get(value)?;
        u64::try_from(signed)
            .map_err(|_| ValueError::Conversion(format!("{signed} cannot be negative")))
    }
}

// uuid columns are VARCHAR(36) in this schema.
impl TryGetable for Uuid {
    fn try_get(value: Value) -> Result<Self, ValueError> {
        let raw = String::try_get(value)?;
        Uuid::parse_str(&raw).map_err(|e| ValueError::Conversion(format!("invalid uuid `{raw}`: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_matching_types() {
        assert_eq!(i64::try_get(Value::BigInt(Some(7))), Ok(7));
        assert_eq!(bool::try_get(Value::Bool(Some(true))), Ok(true));
        assert_eq!(String::try_get(Value::from("team")), Ok("team".to_string()));
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(i64::try_get(Value::Int(Some(42))), Ok(42));
        assert_eq!(i32::try_get(Value::SmallInt(Some(3))), Ok(3));
        assert!(matches!(
            i32::try_get(Value::BigInt(Some(i64::MAX))),
            Err(ValueError::Conversion(_))
        ));
    }

    #[test]
    fn test_null_handling() {
        assert!(matches!(i64::try_get(Value::BigInt(None)), Err(ValueError::Null(_))));
        assert_eq!(String::try_get_opt(Value::String(None)), Ok(None));
        assert_eq!(i64::try_get_opt(Value::BigInt(Some(1))), Ok(Some(1)));
    }

    #[test]
    fn test_type_mismatch_is_not_swallowed_by_opt() {
        let result = String::try_get_opt(Value::Bool(Some(false)));
        assert!(matches!(result, Err(ValueError::TypeMismatch { expected: "String", .. })));
    }

    #[test]
    fn test_negative_count_rejected() {
        assert_eq!(u64::try_get(Value::BigInt(Some(12))), Ok(12));
        assert!(matches!(u64::try_get(Value::BigInt(Some(-1))), Err(ValueError::Conversion(_))));
    }

    #[test]
    fn test_uuid_from_string_column() {
        let id = Uuid::new_v4();
        assert_eq!(Uuid::try_get(Value::from(id.to_string())), Ok(id));
        assert!(matches!(Uuid::try_get(Value::from("not-a-uuid")), Err(ValueError::Conversion(_))));
    }
}
