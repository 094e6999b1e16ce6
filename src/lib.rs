//! # nested-groupby
//!
//! A deferred, multi-level GROUP BY pipeline over in-memory JSON records.
//!
//! ## Overview
//!
//! A pipeline is a chain of stages, one per grouping level:
//! - **Transform**: rewrite each record
//! - **Filter**: drop records, by closure or declarative expression
//! - **Classify**: derive a group key per record
//! - **Aggregate**: fold each group's members into a value
//! - **Sort**: reorder the groups
//! - **Hooks**: observe each level and each group, or stop a level early
//!
//! Building the chain does no work. [`Stage::execute`] runs the root level
//! over the input, then runs each child level once per parent group,
//! against just that group's members. Levels talk to each other through
//! one [`SharedState`].
//!
//! ## Example
//!
//! ```
//! use nested_groupby::{GroupKey, Stage};
//! use serde_json::json;
//!
//! let records = vec![
//!     json!({"pv": 10, "day": "mon"}),
//!     json!({"pv": 20, "day": "tue"}),
//!     json!({"pv": 5, "day": "mon"}),
//! ];
//!
//! let mut per_day = Vec::new();
//! let shared = Stage::root(records)
//!     .classify_by("day")
//!     .export_group_keys_as("days")
//!     .derive()
//!     .count()
//!     .after_all(|level| per_day.push(level.keys.len()))
//!     .execute()
//!     .unwrap();
//!
//! assert_eq!(per_day, vec![2, 1]);
//! assert_eq!(
//!     shared.group_keys("days"),
//!     Some([GroupKey::from("mon"), GroupKey::from("tue")].as_slice())
//! );
//! ```

pub mod aggregate;
pub mod assertion;
pub mod config;
pub mod error;
mod executor;
pub mod group;
pub mod key;
pub mod path;
pub mod shared;
pub mod stage;
pub mod trace;

pub use config::{AggregateConfig, LevelConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use group::{GroupMap, GroupResult};
pub use key::GroupKey;
pub use path::FieldPath;
pub use shared::{SharedState, SharedValue};
pub use stage::{GroupView, LevelView, Stage, from};
pub use trace::{ExecutionTrace, LevelTrace};
