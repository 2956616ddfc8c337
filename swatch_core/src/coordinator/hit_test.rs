// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coalesced hit testing.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::backend::{GraphicsBackend, HitTestParameters};
use crate::error::{BatchKind, HitTestError, SwatchResult};
use crate::lifecycle::LifecyclePhase;
use crate::scheduler::{TaskId, TaskStatus, WorkScheduler};
use crate::sprite::Sprite;

use super::Shared;

/// A resolved hit test.
#[derive(Clone, Debug, PartialEq)]
pub struct HitTestResult {
    /// The query that was actually run.
    pub parameters: HitTestParameters,
    /// Live sprites whose bounds intersect the query, in swatch order.
    pub hits: Vec<Sprite>,
}

pub(crate) struct HitTestState {
    params: HitTestParameters,
    outcome: Option<Result<HitTestResult, HitTestError>>,
}

/// Pending result of [`Coordinator::hit_test`](super::Coordinator::hit_test).
#[derive(Clone)]
pub struct HitTestHandle {
    state: Rc<RefCell<HitTestState>>,
    scheduler: Weak<WorkScheduler>,
    task: TaskId,
}

impl fmt::Debug for HitTestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HitTestHandle")
            .field("params", &state.params)
            .field("outcome", &state.outcome)
            .finish_non_exhaustive()
    }
}

impl PartialEq for HitTestHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl HitTestHandle {
    /// The outcome, once resolved.
    #[must_use]
    pub fn poll(&self) -> Option<Result<HitTestResult, HitTestError>> {
        self.state.borrow().outcome.clone()
    }

    /// Whether the request is still waiting to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.borrow().outcome.is_none()
    }

    /// The parameters the request will run (or ran) with.
    #[must_use]
    pub fn parameters(&self) -> HitTestParameters {
        self.state.borrow().params
    }

    /// Unschedules a pending request and rejects it with
    /// [`HitTestError::Cancelled`]. Resolved requests are left alone.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        if state.outcome.is_some() {
            return;
        }
        state.outcome = Some(Err(HitTestError::Cancelled));
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.unschedule_task(self.task);
        }
    }
}

pub(super) fn request<B: GraphicsBackend + 'static>(
    shared: &Shared<B>,
    params: HitTestParameters,
) -> HitTestHandle {
    let handle = |state: Rc<RefCell<HitTestState>>| HitTestHandle {
        state,
        scheduler: Rc::downgrade(&shared.scheduler),
        task: shared.task_id(BatchKind::HitTest),
    };

    let mut slot = shared.hit_test.borrow_mut();
    if let Some(pending) = slot.as_ref().filter(|s| s.borrow().outcome.is_none()) {
        pending.borrow_mut().params = params;
        return handle(pending.clone());
    }
    let state = Rc::new(RefCell::new(HitTestState {
        params,
        outcome: None,
    }));
    *slot = Some(state.clone());
    drop(slot);
    shared.schedule(BatchKind::HitTest);
    handle(state)
}

#[tracing::instrument(skip_all)]
pub(super) fn resolve<B: GraphicsBackend + 'static>(shared: &Shared<B>) -> SwatchResult<TaskStatus> {
    let Some(state) = shared.hit_test.borrow_mut().take() else {
        return Ok(TaskStatus::Done);
    };
    if state.borrow().outcome.is_some() {
        return Ok(TaskStatus::Done);
    }
    let params = state.borrow().params;
    let count = shared.arena.borrow().instance_count;
    let now = shared.now_ms();
    let flags = shared
        .backend
        .borrow_mut()
        .run_hit_test_pass(&params, count, now);

    let outcome = match flags {
        Ok(flags) => {
            let arena = shared.arena.borrow();
            // A recycled swatch can carry a stale flag from its last occupant.
            let hits = flags
                .iter()
                .enumerate()
                .filter(|&(_, &hit)| hit)
                .filter_map(|(index, _)| arena.record(index))
                .filter(|r| {
                    !matches!(
                        r.borrow().phase,
                        LifecyclePhase::Removed | LifecyclePhase::Created
                    )
                })
                .map(|r| shared.sprite(r))
                .collect();
            Ok(HitTestResult {
                parameters: params,
                hits,
            })
        }
        Err(err) => {
            tracing::warn!(error = %err, "hit test pass failed");
            Err(HitTestError::Backend(err))
        }
    };
    let processed = outcome.as_ref().map_or(0, |result| result.hits.len());
    state.borrow_mut().outcome = Some(outcome);
    shared.emit_batch(BatchKind::HitTest, processed, true);
    Ok(TaskStatus::Done)
}
