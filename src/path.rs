//! Dot-path field access into JSON records.
//!
//! A path such as `"user.address.city"` is split on `.` once, at
//! configuration time, and then walked against each record. Lookup stops
//! with `None` as soon as a segment is absent instead of failing.

use serde_json::Value;
use std::fmt;

/// A pre-split dot-delimited path into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dot-delimited path. The empty string addresses the record itself.
    pub fn parse(path: &str) -> Self {
        let segments = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').map(str::to_string).collect()
        };
        Self { segments }
    }

    /// True if this path addresses the whole record.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Look up the value at this path.
    ///
    /// Object segments are looked up by key, array segments by decimal
    /// index. Any other intermediate value ends the walk with `None`.
    pub fn get<'v>(&self, record: &'v Value) -> Option<&'v Value> {
        if self.is_root() {
            return Some(record);
        }
        self.segments
            .iter()
            .try_fold(record, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Look up the value at this path, substituting `Null` when absent.
    pub fn get_or_null<'v>(&self, record: &'v Value) -> &'v Value {
        self.get(record).unwrap_or(&Value::Null)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
