//! Deferred, level-by-level pipeline executor.
//!
//! Execution starts at the leaf stage. Each stage wraps its own level in a
//! continuation and hands it to its parent, until the root is reached.
//! The root then groups the raw input and, for every group it visits,
//! calls the continuation with that group's members, which groups them
//! at the next level down, and so on. After the run the whole chain is
//! discarded; a stage can only be executed once.

use crate::error::{PipelineError, Result};
use crate::group::{GroupMap, GroupResult};
use crate::key::GroupKey;
use crate::shared::SharedState;
use crate::stage::{GroupView, Level, LevelView, Stage, StageState};
use crate::trace::{ExecutionTrace, LevelTrace};
use serde_json::Value;

/// Per-run state threaded by reference through every level.
#[derive(Debug, Default)]
pub(crate) struct ExecutionContext {
    pub(crate) shared: SharedState,
    pub(crate) trace: Option<ExecutionTrace>,
}

impl ExecutionContext {
    fn new(traced: bool) -> Self {
        Self {
            shared: SharedState::new(),
            trace: traced.then(ExecutionTrace::default),
        }
    }
}

/// The rest of the chain below a level: groups one parent group's members.
type Continuation<'c> = dyn FnMut(&[Value], &mut ExecutionContext) -> Result<()> + 'c;

/// Outcome of grouping one input at one level.
#[derive(Debug, Default)]
struct Grouping {
    keys: Vec<GroupKey>,
    groups: GroupMap,
    accepted: usize,
}

impl Level<'_> {
    /// Transform, filter, classify and fold `records` into groups, then
    /// order the keys.
    fn group(&mut self, records: &[Value]) -> Result<Grouping> {
        let mut grouping = Grouping::default();

        for (index, raw) in records.iter().enumerate() {
            let record = match self.transform.as_mut() {
                Some(transform) => transform(raw.clone(), index, records),
                None => raw.clone(),
            };
            if !self.filter.accepts(&record, index, records)? {
                continue;
            }
            grouping.accepted += 1;

            let key = self.classifier.classify(&record, index, records);
            match grouping.groups.get_mut(&key) {
                Some(group) => {
                    if let Some(fold) = self.aggregate.as_mut() {
                        let acc = group.value.take().unwrap_or(Value::Null);
                        group.value = Some(fold(acc, &record, index));
                    }
                    group.members.push(record);
                }
                None => {
                    let value = match self.aggregate.as_mut() {
                        Some(fold) => Some(fold(self.seed.clone(), &record, index)),
                        None => None,
                    };
                    grouping.keys.push(key.clone());
                    grouping
                        .groups
                        .insert(key.clone(), GroupResult::new(key, record, value));
                }
            }
        }

        if let Some(compare) = self.sort.as_mut() {
            let groups = &grouping.groups;
            grouping
                .keys
                .sort_by(|a, b| compare(&groups[a], &groups[b]));
        }

        Ok(grouping)
    }

    /// Run this level against `records`, descending into `next` once per
    /// visited group.
    pub(crate) fn perform(
        &mut self,
        depth: usize,
        records: &[Value],
        ctx: &mut ExecutionContext,
        mut next: Option<&mut Continuation<'_>>,
    ) -> Result<()> {
        let Grouping {
            keys,
            groups,
            accepted,
        } = self.group(records)?;

        tracing::debug!(
            depth,
            records = records.len(),
            accepted,
            groups = keys.len(),
            shared = ctx.shared.len(),
            "level grouped"
        );

        for name in &self.exports {
            ctx.shared.export_group_keys(name, &keys);
        }

        let slot = ctx.trace.as_mut().map(|trace| {
            trace.begin(LevelTrace {
                depth,
                input_count: records.len(),
                accepted_count: accepted,
                keys: keys.clone(),
                descended: 0,
                stopped_early: false,
            })
        });

        if let Some(hook) = self.before_all.as_mut() {
            hook(LevelView {
                depth,
                keys: &keys,
                groups: &groups,
                shared: &mut ctx.shared,
            });
        }

        let mut descended = 0;
        let mut stopped_early = false;
        for (index, key) in keys.iter().enumerate() {
            let group = &groups[key];

            if let Some(hook) = self.before_each.as_mut()
                && hook(GroupView {
                    depth,
                    index,
                    group,
                    shared: &mut ctx.shared,
                })
                .is_break()
            {
                tracing::trace!(depth, index, "before_each stopped level");
                stopped_early = true;
                break;
            }

            descended += 1;
            if let Some(next) = next.as_deref_mut() {
                next(&group.members, ctx)?;
            }

            if let Some(hook) = self.after_each.as_mut()
                && hook(GroupView {
                    depth,
                    index,
                    group,
                    shared: &mut ctx.shared,
                })
                .is_break()
            {
                tracing::trace!(depth, index, "after_each stopped level");
                stopped_early = true;
                break;
            }
        }

        if let (Some(trace), Some(slot)) = (ctx.trace.as_mut(), slot) {
            trace.finish(slot, descended, stopped_early);
        }

        if let Some(hook) = self.after_all.as_mut() {
            hook(LevelView {
                depth,
                keys: &keys,
                groups: &groups,
                shared: &mut ctx.shared,
            });
        }

        Ok(())
    }
}

impl Stage<'_> {
    /// Run the whole chain this stage ends, and return the shared state
    /// the run produced.
    ///
    /// The chain is torn down whether or not the run succeeds; calling
    /// this again fails with [`PipelineError::AlreadyExecuted`].
    pub fn execute(&mut self) -> Result<SharedState> {
        let ctx = self.run(false)?;
        Ok(ctx.shared)
    }

    /// Like [`execute`](Stage::execute), also returning a trace of every
    /// level invocation.
    pub fn execute_traced(&mut self) -> Result<(SharedState, ExecutionTrace)> {
        let ctx = self.run(true)?;
        Ok((ctx.shared, ctx.trace.unwrap_or_default()))
    }

    fn run(&mut self, traced: bool) -> Result<ExecutionContext> {
        if self.is_executed() {
            return Err(PipelineError::AlreadyExecuted);
        }
        let chain = std::mem::replace(self, Stage::spent());
        let mut ctx = ExecutionContext::new(traced);
        Box::new(chain).thread(None, &mut ctx)?;
        Ok(ctx)
    }

    /// Walk to the root, wrapping each level in a continuation for its parent.
    fn thread(
        self: Box<Self>,
        next: Option<&mut Continuation<'_>>,
        ctx: &mut ExecutionContext,
    ) -> Result<()> {
        let Stage {
            parent,
            source,
            mut level,
            depth,
            state,
        } = *self;
        if state == StageState::Executed {
            return Err(PipelineError::AlreadyExecuted);
        }

        match parent {
            Some(parent) => {
                let mut next = next;
                let mut descend = |records: &[Value], ctx: &mut ExecutionContext| {
                    level.perform(depth, records, ctx, next.as_deref_mut())
                };
                let continuation: &mut Continuation<'_> = &mut descend;
                parent.thread(Some(continuation), ctx)
            }
            None => {
                let records = source.unwrap_or_default();
                level.perform(depth, &records, ctx, next)
            }
        }
    }
}
