//! Pipeline stages: one configured grouping level each.
//!
//! A chain is built root-first and configured fluently. Each call to
//! [`Stage::derive`] consumes the current stage and returns a child that
//! owns it as its parent, so the finished chain is a reversed linked list
//! held by its deepest stage. Nothing runs until
//! [`execute`](Stage::execute) is called on that leaf.

use crate::aggregate::{self, Fold};
use crate::assertion;
use crate::error::Result;
use crate::group::{GroupMap, GroupResult};
use crate::key::GroupKey;
use crate::path::FieldPath;
use crate::shared::SharedState;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::ops::ControlFlow;

type Transform<'a> = dyn FnMut(Value, usize, &[Value]) -> Value + 'a;
type Predicate<'a> = dyn FnMut(&Value, usize, &[Value]) -> bool + 'a;
type ClassifyFn<'a> = dyn FnMut(&Value, usize, &[Value]) -> GroupKey + 'a;
type Comparator<'a> = dyn FnMut(&GroupResult, &GroupResult) -> Ordering + 'a;
type LevelHook<'a> = dyn FnMut(LevelView<'_>) + 'a;
type GroupHook<'a> = dyn FnMut(GroupView<'_>) -> ControlFlow<()> + 'a;

/// Arguments to `before_all` / `after_all` hooks.
pub struct LevelView<'r> {
    /// Level position in the chain, root is 0.
    pub depth: usize,
    /// Group keys in iteration order (first occurrence, then sorted).
    pub keys: &'r [GroupKey],
    pub groups: &'r GroupMap,
    pub shared: &'r mut SharedState,
}

impl LevelView<'_> {
    /// Groups in the order given by `keys`.
    pub fn ordered(&self) -> impl Iterator<Item = &GroupResult> + '_ {
        self.keys.iter().filter_map(|key| self.groups.get(key))
    }
}

/// Arguments to `before_each` / `after_each` hooks.
pub struct GroupView<'r> {
    pub depth: usize,
    /// Position of the group in the level's iteration order.
    pub index: usize,
    pub group: &'r GroupResult,
    pub shared: &'r mut SharedState,
}

pub(crate) enum Filter<'a> {
    All,
    Predicate(Box<Predicate<'a>>),
    Expression(Value),
}

impl Filter<'_> {
    pub(crate) fn accepts(
        &mut self,
        record: &Value,
        index: usize,
        records: &[Value],
    ) -> Result<bool> {
        match self {
            Self::All => Ok(true),
            Self::Predicate(f) => Ok(f(record, index, records)),
            Self::Expression(expr) => assertion::evaluate(expr, record),
        }
    }
}

/// Resolved once at configuration time.
pub(crate) enum Classifier<'a> {
    Position,
    Path(FieldPath),
    Func {
        path: Option<FieldPath>,
        f: Box<ClassifyFn<'a>>,
    },
}

impl Classifier<'_> {
    pub(crate) fn classify(
        &mut self,
        record: &Value,
        index: usize,
        records: &[Value],
    ) -> GroupKey {
        match self {
            Self::Position => GroupKey::position(index),
            Self::Path(path) => GroupKey::from_value(path.get(record)),
            Self::Func { path, f } => {
                let input = path.as_ref().map_or(record, |p| p.get_or_null(record));
                f(input, index, records)
            }
        }
    }
}

/// Configuration of one grouping level.
pub(crate) struct Level<'a> {
    pub(crate) transform: Option<Box<Transform<'a>>>,
    pub(crate) filter: Filter<'a>,
    pub(crate) classifier: Classifier<'a>,
    pub(crate) aggregate: Option<Box<Fold<'a>>>,
    pub(crate) seed: Value,
    pub(crate) sort: Option<Box<Comparator<'a>>>,
    pub(crate) exports: Vec<String>,
    pub(crate) before_all: Option<Box<LevelHook<'a>>>,
    pub(crate) after_all: Option<Box<LevelHook<'a>>>,
    pub(crate) before_each: Option<Box<GroupHook<'a>>>,
    pub(crate) after_each: Option<Box<GroupHook<'a>>>,
}

impl Level<'_> {
    fn new() -> Self {
        Self {
            transform: None,
            filter: Filter::All,
            classifier: Classifier::Position,
            aggregate: None,
            seed: Value::from(0),
            sort: None,
            exports: Vec::new(),
            before_all: None,
            after_all: None,
            before_each: None,
            after_each: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageState {
    Idle,
    Executed,
}

/// One link of a grouping chain.
///
/// ```
/// use nested_groupby::Stage;
/// use serde_json::json;
///
/// let mut totals = Vec::new();
/// Stage::root(vec![
///     json!({"pv": 10, "day": "mon"}),
///     json!({"pv": 20, "day": "tue"}),
///     json!({"pv": 5, "day": "mon"}),
/// ])
/// .classify_by("day")
/// .sum("pv")
/// .after_all(|level| {
///     totals.extend(level.ordered().map(|g| (g.key.to_string(), g.value.clone())));
/// })
/// .execute()
/// .unwrap();
///
/// assert_eq!(totals[0], ("mon".to_string(), Some(json!(15))));
/// assert_eq!(totals[1], ("tue".to_string(), Some(json!(20))));
/// ```
pub struct Stage<'a> {
    pub(crate) parent: Option<Box<Stage<'a>>>,
    pub(crate) source: Option<Vec<Value>>,
    pub(crate) level: Level<'a>,
    pub(crate) depth: usize,
    pub(crate) state: StageState,
}

impl fmt::Debug for Stage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("depth", &self.depth)
            .field("state", &self.state)
            .field("source_len", &self.source.as_ref().map(Vec::len))
            .field("exports", &self.level.exports)
            .finish()
    }
}

/// Shorthand for [`Stage::root`].
pub fn from<'a>(records: impl IntoIterator<Item = Value>) -> Stage<'a> {
    Stage::root(records)
}

impl<'a> Stage<'a> {
    /// Create the root stage holding the raw input.
    pub fn root(records: impl IntoIterator<Item = Value>) -> Self {
        Self {
            parent: None,
            source: Some(records.into_iter().collect()),
            level: Level::new(),
            depth: 0,
            state: StageState::Idle,
        }
    }

    /// A stage whose configuration has been discarded.
    pub(crate) fn spent() -> Self {
        Self {
            parent: None,
            source: None,
            level: Level::new(),
            depth: 0,
            state: StageState::Executed,
        }
    }

    /// Create a child level that groups the members of each group formed here.
    pub fn derive(self) -> Stage<'a> {
        let depth = self.depth + 1;
        Stage {
            parent: Some(Box::new(self)),
            source: None,
            level: Level::new(),
            depth,
            state: StageState::Idle,
        }
    }

    /// Position in the chain; the root is 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True once the stage has been executed and torn down.
    pub fn is_executed(&self) -> bool {
        self.state == StageState::Executed
    }

    /// Keep only records for which `f(record, index, input)` is true.
    ///
    /// Runs after `transform`. Replaces any earlier filter or `filter_where`.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Value, usize, &[Value]) -> bool + 'a,
    {
        self.level.filter = Filter::Predicate(Box::new(f));
        self
    }

    /// Filter with a declarative expression (see [`crate::assertion`]).
    ///
    /// The expression is checked while executing; an invalid shape makes
    /// `execute` fail.
    pub fn filter_where(mut self, expr: Value) -> Self {
        self.level.filter = Filter::Expression(expr);
        self
    }

    /// Rewrite every record before it is filtered and classified.
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: FnMut(Value, usize, &[Value]) -> Value + 'a,
    {
        self.level.transform = Some(Box::new(f));
        self
    }

    /// Group records by the key `f(record, index, input)` returns.
    pub fn classify<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Value, usize, &[Value]) -> GroupKey + 'a,
    {
        self.level.classifier = Classifier::Func {
            path: None,
            f: Box::new(f),
        };
        self
    }

    /// Group records by the value at a dot path.
    pub fn classify_by(mut self, path: &str) -> Self {
        self.level.classifier = Classifier::Path(FieldPath::parse(path));
        self
    }

    /// Group records by `f` applied to the value at `path` (`Null` if absent).
    pub fn classify_at<F>(mut self, path: &str, f: F) -> Self
    where
        F: FnMut(&Value, usize, &[Value]) -> GroupKey + 'a,
    {
        self.level.classifier = Classifier::Func {
            path: Some(FieldPath::parse(path)),
            f: Box::new(f),
        };
        self
    }

    /// Fold each group's members with `f(accumulator, record, index)`,
    /// starting from `seed`. `index` is the record's position in this
    /// level's input.
    pub fn aggregate<F>(mut self, f: F, seed: Value) -> Self
    where
        F: FnMut(Value, &Value, usize) -> Value + 'a,
    {
        self.level.aggregate = Some(Box::new(f));
        self.level.seed = seed;
        self
    }

    /// Sum the values at `path`, starting from 0.
    pub fn sum(self, path: &str) -> Self {
        self.sum_from(path, Value::from(0))
    }

    pub fn sum_from(self, path: &str, base: Value) -> Self {
        self.aggregate(aggregate::sum(FieldPath::parse(path)), base)
    }

    /// Count group members, starting from 0.
    pub fn count(self) -> Self {
        self.count_from(0)
    }

    pub fn count_from(self, base: i64) -> Self {
        self.aggregate(aggregate::count(), Value::from(base))
    }

    /// Approximate average of the values at `path`.
    ///
    /// Uses `(acc * x + index) / (index + 1)`, which is not a true mean.
    /// Keeps the seed already configured (0 by default).
    pub fn avg(mut self, path: &str) -> Self {
        self.level.aggregate = Some(Box::new(aggregate::avg(FieldPath::parse(path))));
        self
    }

    /// Reorder the group keys with a comparator (stable).
    pub fn sort<F>(mut self, f: F) -> Self
    where
        F: FnMut(&GroupResult, &GroupResult) -> Ordering + 'a,
    {
        self.level.sort = Some(Box::new(f));
        self
    }

    /// Runs once per level, after grouping and before any group is visited.
    pub fn before_all<F>(mut self, f: F) -> Self
    where
        F: FnMut(LevelView<'_>) + 'a,
    {
        self.level.before_all = Some(Box::new(f));
        self
    }

    /// Runs once per level, after the group loop (even if it stopped early).
    pub fn after_all<F>(mut self, f: F) -> Self
    where
        F: FnMut(LevelView<'_>) + 'a,
    {
        self.level.after_all = Some(Box::new(f));
        self
    }

    /// Runs before each group is descended into. `Break` stops this level's loop.
    pub fn before_each<F>(mut self, f: F) -> Self
    where
        F: FnMut(GroupView<'_>) -> ControlFlow<()> + 'a,
    {
        self.level.before_each = Some(Box::new(f));
        self
    }

    /// Runs after each group's child levels finish. `Break` stops this level's loop.
    pub fn after_each<F>(mut self, f: F) -> Self
    where
        F: FnMut(GroupView<'_>) -> ControlFlow<()> + 'a,
    {
        self.level.after_each = Some(Box::new(f));
        self
    }

    /// Publish this level's ordered key list into shared state under `name`.
    pub fn export_group_keys_as(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.level.exports.contains(&name) {
            self.level.exports.push(name);
        }
        self
    }
}
