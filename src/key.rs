//! Group keys produced by classifiers.

use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;

/// The key a classifier assigns to a record.
///
/// Records with equal keys land in the same group at one level. Number keys
/// are normalised on construction, so `1` and `1.0` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Str(String),
    Number(Number),
    Bool(bool),
    Null,
    /// The classifier path was absent from the record.
    Undefined,
}

impl GroupKey {
    /// Key for a value looked up from a record.
    ///
    /// Arrays and objects are keyed by their compact JSON text.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None => Self::Undefined,
            Some(Value::Null) => Self::Null,
            Some(Value::Bool(b)) => Self::Bool(*b),
            Some(Value::Number(n)) => Self::Number(normalize(n)),
            Some(Value::String(s)) => Self::Str(s.clone()),
            Some(other) => Self::Str(other.to_string()),
        }
    }

    /// Key used when no classifier is configured: the record's position.
    pub fn position(index: usize) -> Self {
        Self::Number(Number::from(index))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

/// Whole floats within `i64` range become integers; everything else is kept.
fn normalize(n: &Number) -> Number {
    if n.is_f64()
        && let Some(f) = n.as_f64()
        && f.fract() == 0.0
        && f >= i64::MIN as f64
        && f < i64::MAX as f64
    {
        return Number::from(f as i64);
    }
    n.clone()
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for GroupKey {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for GroupKey {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for GroupKey {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<usize> for GroupKey {
    fn from(n: usize) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for GroupKey {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, |n| Self::Number(normalize(&n)))
    }
}

impl From<bool> for GroupKey {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}
