//! Declarative pipeline configuration.
//!
//! Covers the data-only options of each level: classification by path,
//! a filter expression, one of the built-in aggregations and key exports.
//! Hooks, custom classifiers and comparators stay in code.
//!
//! ```json
//! {
//!   "levels": [
//!     { "classify": "day", "aggregate": { "kind": "sum", "path": "pv" },
//!       "export_group_keys_as": ["days"] },
//!     { "where": ["pv", ">", 8], "aggregate": { "kind": "count" } }
//!   ]
//! }
//! ```

use crate::error::Result;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Built-in aggregation for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AggregateConfig {
    Sum {
        path: String,
        #[serde(default = "zero")]
        base: Value,
    },
    Count {
        #[serde(default)]
        base: i64,
    },
    Avg {
        path: String,
    },
}

fn zero() -> Value {
    Value::from(0)
}

/// Options for one grouping level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelConfig {
    /// Dot path to group by; absent means one group per record.
    pub classify: Option<String>,
    /// Filter expression, see [`crate::assertion`].
    #[serde(rename = "where")]
    pub condition: Option<Value>,
    pub aggregate: Option<AggregateConfig>,
    pub export_group_keys_as: Vec<String>,
}

/// A whole chain, root level first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub levels: Vec<LevelConfig>,
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the chain over `records` and return its leaf stage.
    ///
    /// An empty level list yields a bare root stage.
    pub fn build<'a>(&self, records: impl IntoIterator<Item = Value>) -> Stage<'a> {
        let mut levels = self.levels.iter();
        let mut stage = Stage::root(records);
        if let Some(first) = levels.next() {
            stage = stage.configure(first);
        }
        for level in levels {
            stage = stage.derive().configure(level);
        }
        stage
    }
}

impl Stage<'_> {
    /// Apply one level's declarative options to this stage.
    pub fn configure(mut self, config: &LevelConfig) -> Self {
        if let Some(path) = &config.classify {
            self = self.classify_by(path);
        }
        if let Some(expr) = &config.condition {
            self = self.filter_where(expr.clone());
        }
        self = match &config.aggregate {
            Some(AggregateConfig::Sum { path, base }) => self.sum_from(path, base.clone()),
            Some(AggregateConfig::Count { base }) => self.count_from(*base),
            Some(AggregateConfig::Avg { path }) => self.avg(path),
            None => self,
        };
        for name in &config.export_group_keys_as {
            self = self.export_group_keys_as(name.clone());
        }
        self
    }
}
