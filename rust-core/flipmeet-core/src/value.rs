//! # Scalar Values
//!
//! The value type carried by request parameters, database rows and entity
//! accessors.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only represents and coerces scalar values
//! - **O**: New conversions are added as `From` impls
//! - **D**: Router, models and validator all depend on this one type

use crate::error::{Error, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Named parameters: URL bindings merged with body fields
pub type Params = BTreeMap<String, Value>;

/// One database row, column name to value
pub type Row = BTreeMap<String, Value>;

/// A scalar value
///
/// Nested arrays and objects are not representable; request bodies that
/// contain them are rejected before they reach a handler.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL / JSON null
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// Text value
    Text(String),
}

impl Value {
    /// Check for `Null`
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render as text. `Null` renders as the empty string.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(true) => Cow::Borrowed("1"),
            Self::Bool(false) => Cow::Borrowed("0"),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Get as i64. Text is parsed after trimming.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Float(_) => None,
        }
    }

    /// Coerce into an integer for an entity field
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` when the value has no integer reading.
    pub fn into_i64(self, field: &str) -> Result<i64> {
        self.as_i64().ok_or_else(|| Error::InvalidValue {
            field: field.to_string(),
            expected: "integer",
        })
    }

    /// Coerce into text for an entity field
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            other => other.as_text().into_owned(),
        }
    }

    /// Convert a JSON scalar. Arrays and objects are refused.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedBody` for nested values.
    pub fn from_json(field: &str, value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => Ok(n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null)),
            serde_json::Value::String(s) => Ok(Self::Text(s)),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(Error::MalformedBody {
                    reason: format!("field '{field}' must be a scalar"),
                })
            }
        }
    }

    /// Convert into a JSON value
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_text() {
        assert_eq!(Value::Null.as_text(), "");
        assert_eq!(Value::Int(42).as_text(), "42");
        assert_eq!(Value::from("ana").as_text(), "ana");
        assert_eq!(Value::Bool(true).as_text(), "1");
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Value::from(" 7 ").as_i64(), Some(7));
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::from("abc").as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn test_into_i64_error() {
        let err = Value::from("x").into_i64("fkuser").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { expected: "integer", .. }));
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json("a", json!(1)).unwrap(), Value::Int(1));
        assert_eq!(Value::from_json("a", json!(1.5)).unwrap(), Value::Float(1.5));
        assert_eq!(Value::from_json("a", json!("hi")).unwrap(), Value::from("hi"));
        assert_eq!(Value::from_json("a", json!(null)).unwrap(), Value::Null);
    }

    #[test]
    fn test_from_json_rejects_nested() {
        let err = Value::from_json("tags", json!(["a"])).unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_serialize_untagged() {
        let row: Row = [
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::from("Ana")),
            ("photo".to_string(), Value::Null),
        ]
        .into_iter()
        .collect();
        let text = serde_json::to_string(&row).unwrap();
        assert_eq!(text, r#"{"id":1,"name":"Ana","photo":null}"#);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(5_i64)), Value::Int(5));
    }
}
