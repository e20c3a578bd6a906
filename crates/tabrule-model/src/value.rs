//! Cell values for tabular datasets.
//!
//! Decoders (CSV, Excel, JSON) hand the engine a generic [`Value`] per cell.
//! Numbers are kept as `f64`; dates travel as text until a normalization
//! rule rewrites them to `YYYY-MM-DD`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Hashable, totally ordered identity of a [`Value`].
///
/// Used as the partition key for group-by and pivot so that `1` and `1.0`
/// land in the same group while `"1"` (text) stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
}

impl Value {
    /// Returns true for `Null` and for text that is empty after trimming.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the value. Numeric-looking text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) if v.is_finite() => Some(*v),
            Value::Text(text) => parse_f64(text),
            _ => None,
        }
    }

    /// Borrow the text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Render the value for display and delimited export.
    ///
    /// `Null` renders as an empty string; whole numbers render without a
    /// trailing `.0`.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(v) => format_numeric(*v),
            Value::Text(text) => text.clone(),
        }
    }

    /// Partition key for grouping.
    pub fn key(&self) -> ValueKey {
        match self {
            _ if self.is_null() => ValueKey::Null,
            Value::Bool(b) => ValueKey::Bool(*b),
            // Normalise -0.0 so it groups with 0.0.
            Value::Number(v) => ValueKey::Number((v + 0.0).to_bits()),
            Value::Text(text) => ValueKey::Text(text.clone()),
            Value::Null => ValueKey::Null,
        }
    }

    /// Ordering used for `min`/`max` over mixed values.
    ///
    /// Numbers compare numerically, everything else by rendered text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => self.render().cmp(&other.render()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Parses a string as f64, returning None for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Formats a floating-point number as a string without trailing zeros.
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') && !s.contains('e') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_null() {
        assert!(Value::Null.is_null());
        assert!(Value::from("  ").is_null());
        assert!(!Value::from("x").is_null());
        assert!(!Value::from(0.0).is_null());
    }

    #[test]
    fn numeric_text_parses() {
        assert_eq!(Value::from(" 12.5 ").as_f64(), Some(12.5));
        assert_eq!(Value::from("abc").as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn format_numeric_keeps_integer_digits() {
        assert_eq!(format_numeric(140.0), "140");
        assert_eq!(format_numeric(10.50), "10.5");
        assert_eq!(format_numeric(-3.0), "-3");
    }

    #[test]
    fn keys_group_negative_zero_with_zero() {
        assert_eq!(Value::from(-0.0).key(), Value::from(0.0).key());
        assert_ne!(Value::from(1.0).key(), Value::from("1").key());
    }

    #[test]
    fn untagged_serde_shape() {
        let values = vec![Value::Null, Value::from(1.5), Value::from("a"), Value::Bool(false)];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,1.5,"a",false]"#);
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
