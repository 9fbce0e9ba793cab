//! Shared input patterns.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Letters and digits only. Order-by input must match before it is looked up.
pub static ALPHA_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap_or_else(|e| panic!("invalid pattern: {e}")));

/// Canonical hyphenated UUID, case-insensitive.
pub static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap_or_else(|e| panic!("invalid pattern: {e}"))
});

pub fn is_alpha_numeric(input: &str) -> bool {
    ALPHA_NUMERIC.is_match(input)
}

pub fn is_uuid(input: &str) -> bool {
    UUID.is_match(input)
}

/// True when `input` holds no control characters (tabs and newlines included).
pub fn is_printable(input: &str) -> bool {
    !input.chars().any(char::is_control)
}

/// A field value an entity refuses to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Not a 36-character hyphenated UUID
    InvalidUuid(String),
    /// Character count outside `min..=max`
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    /// Contains tabs, newlines or other control characters
    ControlCharacters(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidUuid(value) => write!(f, "Invalid UUID: {value:?}"),
            ValidationError::Length {
                field,
                min,
                max,
                actual,
            } => write!(f, "Field `{field}` must be {min}..={max} characters, got {actual}"),
            ValidationError::ControlCharacters(field) => {
                write!(f, "Field `{field}` contains control characters")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a free-text field: length in characters and no control characters.
///
/// # Errors
///
/// Returns the first constraint `value` violates.
pub fn check_text(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::Length {
            field,
            min,
            max,
            actual,
        });
    }
    if !is_printable(value) {
        return Err(ValidationError::ControlCharacters(field));
    }
    Ok(())
}
