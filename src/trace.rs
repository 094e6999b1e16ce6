//! Debug trace types for pipeline execution.
//!
//! One [`LevelTrace`] is recorded for every time a level groups an input,
//! in the order those invocations start (root first, then depth-first).

use crate::key::GroupKey;

/// What one level invocation did with its input.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTrace {
    /// Level position in the chain, root is 0.
    pub depth: usize,
    /// Records handed to the level.
    pub input_count: usize,
    /// Records that passed the filter.
    pub accepted_count: usize,
    /// Group keys in iteration order.
    pub keys: Vec<GroupKey>,
    /// Groups that got past `before_each` and were handed to the child level.
    pub descended: usize,
    /// A `before_each` or `after_each` hook stopped the loop.
    pub stopped_early: bool,
}

/// Complete trace of one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionTrace {
    pub levels: Vec<LevelTrace>,
}

impl ExecutionTrace {
    /// Invocations of the level at `depth`, in execution order.
    pub fn at_depth(&self, depth: usize) -> impl Iterator<Item = &LevelTrace> {
        self.levels.iter().filter(move |level| level.depth == depth)
    }

    pub(crate) fn begin(&mut self, level: LevelTrace) -> usize {
        self.levels.push(level);
        self.levels.len() - 1
    }

    pub(crate) fn finish(&mut self, slot: usize, descended: usize, stopped_early: bool) {
        if let Some(level) = self.levels.get_mut(slot) {
            level.descended = descended;
            level.stopped_early = stopped_early;
        }
    }
}
