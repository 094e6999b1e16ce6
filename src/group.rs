//! Per-level grouping results.

use crate::key::GroupKey;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// All groups formed at one level, keyed by classifier key.
///
/// Iteration order of the map is unspecified; the ordered key list handed
/// to hooks alongside it is the authoritative order.
pub type GroupMap = HashMap<GroupKey, GroupResult>;

/// One group: the records sharing a key, and their folded aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub key: GroupKey,
    /// Post-transform records in arrival order.
    pub members: Vec<Value>,
    /// Aggregate value, `None` when the level has no aggregator.
    pub value: Option<Value>,
}

impl GroupResult {
    pub(crate) fn new(key: GroupKey, first: Value, value: Option<Value>) -> Self {
        Self {
            key,
            members: vec![first],
            value,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The aggregate as a float, if it is a JSON number.
    pub fn value_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(Value::as_f64)
    }
}
