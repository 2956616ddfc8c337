// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batch operations run by the scheduler on behalf of a coordinator.
//!
//! Every batch scans one [`NumericRange`] and skips entries that turn out not
//! to be eligible. The budget is consulted once every `step_check_interval`
//! entries. A batch that runs out of budget leaves its range covering
//! exactly the unscanned remainder and reports [`TaskStatus::Pending`].

use alloc::rc::Weak;
use alloc::vec::Vec;

use crate::attributes::TRANSITION_TIME_MS;
use crate::backend::GraphicsBackend;
use crate::error::{BatchKind, SwatchError, SwatchResult};
use crate::lifecycle::LifecyclePhase;
use crate::range::NumericRange;
use crate::scheduler::{Budget, Task, TaskStatus};
use crate::trace::{BatchEvent, SpriteRemovedEvent};
use crate::view::SpriteView;

use super::{Shared, hit_test};

/// Scheduler-facing wrapper that dispatches to one batch.
pub(crate) struct BatchTask<B> {
    pub(crate) shared: Weak<Shared<B>>,
    pub(crate) kind: BatchKind,
}

impl<B: GraphicsBackend + 'static> Task for BatchTask<B> {
    fn step(&mut self, budget: &Budget<'_>) -> SwatchResult<TaskStatus> {
        let Some(shared) = self.shared.upgrade() else {
            return Ok(TaskStatus::Done);
        };
        match self.kind {
            BatchKind::AssignWaiting => shared.assign_waiting(budget),
            BatchKind::RunCallbacks => shared.run_callbacks(budget),
            BatchKind::Rebase => shared.rebase(budget),
            BatchKind::TextureSync => shared.texture_sync(budget),
            BatchKind::Removal => shared.removal(budget),
            BatchKind::Draw => shared.draw(),
            BatchKind::HitTest => hit_test::resolve(&shared),
        }
    }
}

const fn status(completed: bool) -> TaskStatus {
    if completed {
        TaskStatus::Done
    } else {
        TaskStatus::Pending
    }
}

impl<B: GraphicsBackend + 'static> Shared<B> {
    fn should_yield(&self, scanned: usize, budget: &Budget<'_>) -> bool {
        scanned > 0 && scanned % self.step_check_interval == 0 && budget.is_exhausted()
    }

    pub(super) fn emit_batch(&self, kind: BatchKind, processed: usize, completed: bool) {
        tracing::trace!(?kind, processed, completed, "batch step");
        let timestamp = self.timing().now();
        self.with_tracer(|t| {
            t.batch(&BatchEvent {
                kind,
                processed: u32::try_from(processed).unwrap_or(u32::MAX),
                completed,
                timestamp,
            });
        });
    }

    /// Moves waiting sprites into recycled swatches.
    pub(super) fn assign_waiting(&self, budget: &Budget<'_>) -> SwatchResult<TaskStatus> {
        let mut arena = self.arena.borrow_mut();
        let mut assigned = 0;
        let completed = loop {
            if self.should_yield(assigned, budget) {
                break false;
            }
            arena.prune_waiting();
            if arena.waiting.is_empty() {
                break true;
            }
            let Some(index) = arena.take_free_index() else {
                break true;
            };
            let Some(record) = arena.waiting.pop_front() else {
                break true;
            };
            self.assign(&mut arena, index, record)?;
            assigned += 1;
        };
        drop(arena);
        self.emit_batch(BatchKind::AssignWaiting, assigned, completed);
        Ok(status(completed))
    }

    /// Runs one pending callback for each sprite in the callbacks range.
    pub(super) fn run_callbacks(&self, budget: &Budget<'_>) -> SwatchResult<TaskStatus> {
        // Take the range so that callbacks registered while user code runs
        // accumulate in a fresh one.
        let taken = {
            let mut arena = self.arena.borrow_mut();
            let bounds = arena.callbacks.bounds();
            arena.callbacks.clear();
            bounds
        };
        let Some((low, high)) = taken else {
            return Ok(TaskStatus::Done);
        };

        let vps = self.mapper.values_per_swatch();
        let tt_index = self.mapper.component_index(TRANSITION_TIME_MS);
        let mut outcome = Ok(());
        let (mut needs_rebase, mut needs_sync, mut needs_removal) = (false, false, false);
        let mut processed = 0;
        let mut index = low;
        while index <= high {
            if self.should_yield(index - low, budget) {
                break;
            }
            let current = index;
            index += 1;

            let (record, callback, mut values) = {
                let mut arena = self.arena.borrow_mut();
                let Some(record) = arena.record(current).cloned() else {
                    continue;
                };
                let callback = {
                    let mut r = record.borrow_mut();
                    if r.phase != LifecyclePhase::HasCallback {
                        continue;
                    }
                    r.take_next_callback()
                };
                let Some(callback) = callback else {
                    outcome = Err(SwatchError::invariant(
                        BatchKind::RunCallbacks,
                        "sprite in HasCallback without a pending callback",
                    ));
                    break;
                };
                (record, callback, arena.swatch_mut(current, vps).to_vec())
            };

            if let Some(tt) = tt_index {
                values[tt] = self.default_transition_ms;
            }
            let now = self.now_ms();
            let result = callback(&mut SpriteView::new(&self.mapper, &mut values));
            let transition = tt_index
                .map_or(self.default_transition_ms, |tt| values[tt])
                .max(0.0);
            let arrival = now + transition;
            if let Some(tt) = tt_index {
                values[tt] = arrival;
            }

            let mut arena = self.arena.borrow_mut();
            let mut r = record.borrow_mut();
            r.arrival_ms = arrival;
            // Fresh target values supersede any earlier zero fill.
            r.zeroed = false;
            if arrival > arena.latest_arrival_ms {
                arena.latest_arrival_ms = arrival;
            }
            if r.to_be_removed && !r.has_callback() {
                if arrival <= now {
                    values.fill(0.0);
                    r.zeroed = true;
                } else {
                    arena.removal.expand_to_include(current);
                    arena.removal_ts.expand_to_include(arrival);
                    needs_removal = true;
                }
            }
            arena.swatch_mut(current, vps).copy_from_slice(&values);
            if arrival > now {
                r.phase.transition_to(LifecyclePhase::NeedsRebase)?;
                arena.rebase.expand_to_include(current);
                needs_rebase = true;
            } else {
                r.phase.transition_to(LifecyclePhase::NeedsTextureSync)?;
                arena.sync.expand_to_include(current);
                needs_sync = true;
            }
            processed += 1;

            if let Err(source) = result {
                tracing::warn!(index = current, error = %source, "sprite callback failed");
                outcome = Err(SwatchError::Callback {
                    index: current,
                    source,
                });
                break;
            }
        }

        let completed = index > high;
        if !completed {
            let mut arena = self.arena.borrow_mut();
            arena.callbacks.expand_to_include(index);
            arena.callbacks.expand_to_include(high);
        }
        if needs_rebase {
            self.schedule(BatchKind::Rebase);
        }
        if needs_sync {
            self.schedule(BatchKind::TextureSync);
        }
        if needs_removal {
            self.schedule(BatchKind::Removal);
        }
        self.emit_batch(BatchKind::RunCallbacks, processed, completed);

        // A failed task is dropped by the scheduler; keep the rest going.
        if outcome.is_err() && self.arena.borrow().callbacks.is_defined() {
            self.schedule(BatchKind::RunCallbacks);
        }
        outcome.map(|()| status(completed))
    }

    /// Captures in-flight interpolation state for sprites about to receive
    /// a new target.
    pub(super) fn rebase(&self, budget: &Budget<'_>) -> SwatchResult<TaskStatus> {
        let mut arena = self.arena.borrow_mut();
        let Some((low, high)) = arena.rebase.bounds() else {
            return Ok(TaskStatus::Done);
        };
        let mut uvs = Vec::new();
        let mut index = low;
        while index <= high {
            if self.should_yield(index - low, budget) {
                break;
            }
            if let Some(record) = arena.record(index).cloned() {
                let mut r = record.borrow_mut();
                if r.phase == LifecyclePhase::NeedsRebase {
                    r.phase.transition_to(LifecyclePhase::NeedsTextureSync)?;
                    arena.sync.expand_to_include(index);
                    uvs.push(self.mapper.swatch_uv(index));
                }
            }
            index += 1;
        }

        let completed = index > high;
        if completed {
            arena.rebase.clear();
        } else {
            arena.rebase.truncate_to_within(index, high);
        }
        drop(arena);
        if uvs.is_empty() && completed {
            return Err(SwatchError::invariant(
                BatchKind::Rebase,
                "rebase range held no sprite in NeedsRebase",
            ));
        }

        if !uvs.is_empty() {
            let now = self.now_ms();
            self.backend.borrow_mut().run_rebase_pass(&uvs, now);
            self.schedule(BatchKind::TextureSync);
        }
        self.emit_batch(BatchKind::Rebase, uvs.len(), completed);
        Ok(status(completed))
    }

    /// Decides each synced sprite's next phase and flashes its rows.
    pub(super) fn texture_sync(&self, budget: &Budget<'_>) -> SwatchResult<TaskStatus> {
        let mut arena = self.arena.borrow_mut();
        let Some((low, high)) = arena.sync.bounds() else {
            return Ok(TaskStatus::Done);
        };
        let row = |i| self.mapper.swatch_row(i);

        if let Some((rebase_low, rebase_high)) = arena.rebase.bounds() {
            let sync_rows = NumericRange::from_bounds(row(low), row(high));
            let rebase_rows = NumericRange::from_bounds(row(rebase_low), row(rebase_high));
            if sync_rows.overlaps(&rebase_rows) {
                drop(arena);
                tracing::trace!("texture sync deferred behind rebase of shared rows");
                self.schedule_now(BatchKind::Rebase);
                self.schedule_now(BatchKind::TextureSync);
                self.emit_batch(BatchKind::TextureSync, 0, false);
                return Ok(TaskStatus::Done);
            }
        }

        let now = self.now_ms();
        let mut removed = Vec::new();
        let (mut needs_callbacks, mut needs_removal) = (false, false);
        let mut processed = 0;
        let mut index = low;
        while index <= high {
            if self.should_yield(index - low, budget) {
                break;
            }
            let current = index;
            index += 1;
            let Some(record) = arena.record(current).cloned() else {
                continue;
            };
            let mut r = record.borrow_mut();
            if r.phase != LifecyclePhase::NeedsTextureSync {
                continue;
            }
            if r.has_callback() {
                r.phase.transition_to(LifecyclePhase::HasCallback)?;
                arena.callbacks.expand_to_include(current);
                needs_callbacks = true;
            } else if !r.to_be_removed {
                r.phase.transition_to(LifecyclePhase::Rest)?;
            } else if r.zeroed && r.arrival_ms <= now {
                r.phase.transition_to(LifecyclePhase::Removed)?;
                arena.removed.expand_to_include(current);
                removed.push(current);
            } else {
                r.phase.transition_to(LifecyclePhase::Rest)?;
                arena.removal.expand_to_include(current);
                arena.removal_ts.expand_to_include(r.arrival_ms);
                needs_removal = true;
            }
            processed += 1;
        }

        let completed = index > high;
        if index > low {
            let vpr = self.mapper.values_per_row();
            let (first_row, last_row) = (row(low), row(index - 1));
            let data = &arena.target[first_row * vpr..(last_row + 1) * vpr];
            self.backend.borrow_mut().upload_swatch_rows(
                first_row,
                self.mapper.texture_width(),
                last_row - first_row + 1,
                data,
            );
        }
        if completed {
            arena.sync.clear();
        } else {
            arena.sync.truncate_to_within(index, high);
        }
        drop(arena);

        if !removed.is_empty() {
            let timestamp = self.timing().now();
            for &index in &removed {
                tracing::debug!(index, "sprite removed");
                self.with_tracer(|t| t.sprite_removed(&SpriteRemovedEvent { index, timestamp }));
            }
            self.schedule(BatchKind::AssignWaiting);
        }
        if needs_callbacks {
            self.schedule(BatchKind::RunCallbacks);
        }
        if needs_removal {
            self.schedule(BatchKind::Removal);
        }
        self.schedule(BatchKind::Draw);
        self.emit_batch(BatchKind::TextureSync, processed, completed);
        Ok(status(completed))
    }

    /// Clears to-be-removed sprites whose exit transition has elapsed.
    pub(super) fn removal(&self, budget: &Budget<'_>) -> SwatchResult<TaskStatus> {
        let now = self.now_ms();
        let mut arena = self.arena.borrow_mut();
        let Some((low, high)) = arena.removal.bounds() else {
            return Ok(TaskStatus::Done);
        };
        if arena.removal_ts.low().is_some_and(|earliest| now < earliest) {
            drop(arena);
            self.schedule(BatchKind::Removal);
            return Ok(TaskStatus::Done);
        }

        let vps = self.mapper.values_per_swatch();
        let mut keep = NumericRange::new();
        let mut keep_ts = NumericRange::new();
        let mut flushed = 0;
        let mut index = low;
        while index <= high {
            if self.should_yield(index - low, budget) {
                break;
            }
            let current = index;
            index += 1;
            let Some(record) = arena.record(current).cloned() else {
                continue;
            };
            let mut r = record.borrow_mut();
            if r.phase != LifecyclePhase::Rest || !r.to_be_removed || r.has_callback() {
                continue;
            }
            if r.arrival_ms <= now {
                arena.swatch_mut(current, vps).fill(0.0);
                r.zeroed = true;
                r.phase.transition_to(LifecyclePhase::NeedsTextureSync)?;
                arena.sync.expand_to_include(current);
                flushed += 1;
            } else {
                keep.expand_to_include(current);
                keep_ts.expand_to_include(r.arrival_ms);
            }
        }
        if index <= high {
            keep.expand_to_include(index);
            keep.expand_to_include(high);
            if let Some((ts_low, ts_high)) = arena.removal_ts.bounds() {
                keep_ts.expand_to_include(ts_low);
                keep_ts.expand_to_include(ts_high);
            }
        }
        arena.removal = keep;
        arena.removal_ts = keep_ts;
        let watching = arena.removal.is_defined();
        drop(arena);

        if flushed > 0 {
            self.schedule(BatchKind::TextureSync);
        }
        if watching {
            self.schedule(BatchKind::Removal);
        }
        self.emit_batch(BatchKind::Removal, flushed, !watching);
        Ok(TaskStatus::Done)
    }

    /// Draws the live instances; keeps drawing while transitions run.
    pub(super) fn draw(&self) -> SwatchResult<TaskStatus> {
        let now = self.now_ms();
        let (count, latest) = {
            let arena = self.arena.borrow();
            (arena.instance_count, arena.latest_arrival_ms)
        };
        self.backend.borrow_mut().draw(count, now);
        if now < latest {
            self.schedule(BatchKind::Draw);
        }
        Ok(TaskStatus::Done)
    }
}
