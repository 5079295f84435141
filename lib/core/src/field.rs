//! Field values
//!
//! A [`Field`] is a text value with cached numeric interpretations.

use crate::{Error, Result};
use std::fmt;
use std::sync::OnceLock;

/// A single comparison value of a record.
///
/// The blank flag is computed once at construction. Numeric interpretations
/// are parsed on first access and cached, including parse failures.
#[derive(Debug, Clone)]
pub struct Field {
    value: String,
    blank: bool,
    int_value: OnceLock<Option<i64>>,
    float_value: OnceLock<Option<f64>>,
}

impl Field {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let blank = value.trim().is_empty();
        Self {
            value,
            blank,
            int_value: OnceLock::new(),
            float_value: OnceLock::new(),
        }
    }

    /// True if the value is empty or all whitespace.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    /// The original string value.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The value parsed as an integer. Surrounding whitespace is ignored.
    pub fn as_int(&self) -> Result<i64> {
        self.int_value
            .get_or_init(|| self.value.trim().parse::<i64>().ok())
            .ok_or_else(|| Error::NotNumeric {
                value: self.value.clone(),
                kind: "integer",
            })
    }

    /// The value parsed as a float. Surrounding whitespace is ignored.
    pub fn as_float(&self) -> Result<f64> {
        self.float_value
            .get_or_init(|| self.value.trim().parse::<f64>().ok())
            .ok_or_else(|| Error::NotNumeric {
                value: self.value.clone(),
                kind: "number",
            })
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Field {}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::new(value)
    }
}
