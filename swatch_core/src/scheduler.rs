// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative, time-budgeted task queue.
//!
//! [`WorkScheduler`] runs queued [`Task`]s inside a bounded slice of host
//! time. It is driven from outside by two timers obtained from the
//! [`TimingSource`]: a frame-aligned tick and a timeout-aligned tick that
//! keeps firing when no frames are produced.
//!
//! # Work cycle
//!
//! ```text
//!   present queue ──pop──► task.step(budget) ──Pending──► future queue
//!         ▲                      │                              │
//!         │                      └──Done──► dropped             │
//!         └──────────── merged after the cycle ◄────────────────┘
//! ```
//!
//! Tasks drain FIFO from the *present* queue. A `run_until_done` task is
//! stepped until it reports [`TaskStatus::Done`] or the budget runs out; in
//! the latter case it moves to the *future* queue, which is merged back only
//! once the whole cycle is over, so one task cannot starve the rest of a
//! slice. Tasks scheduled while a cycle is running also land in the future
//! queue unless they ask to [`begin_immediately`](TaskOptions::begin_immediately).
//!
//! A task is dequeued before it is invoked. If it fails, the error
//! propagates out of the tick and the queues stay consistent.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::error::{SchedulerError, SwatchResult};
use crate::time::{Duration, HostTime};
use crate::timing::{TickKind, TimerId, TimingSource};
use crate::trace::{TraceSink, Tracer, WorkCycleEvent};

/// Stable identity of a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// Result of one task step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task has nothing left to do.
    Done,
    /// The task stopped early (usually because the budget ran out).
    Pending,
}

/// How a task is queued and re-invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Keep stepping until done or out of budget, then requeue the rest.
    pub run_until_done: bool,
    /// Skip timeout-driven cycles; only run on frame ticks and direct work.
    pub animation_only: bool,
    /// When scheduled during a cycle, run in that same cycle.
    pub begin_immediately: bool,
}

impl TaskOptions {
    /// Options for an incremental task.
    #[must_use]
    pub const fn until_done() -> Self {
        Self {
            run_until_done: true,
            animation_only: false,
            begin_immediately: false,
        }
    }

    /// Options for a one-shot task.
    #[must_use]
    pub const fn one_shot() -> Self {
        Self {
            run_until_done: false,
            animation_only: false,
            begin_immediately: false,
        }
    }

    /// Sets [`animation_only`](Self::animation_only).
    #[must_use]
    pub const fn animation_only(mut self) -> Self {
        self.animation_only = true;
        self
    }

    /// Sets [`begin_immediately`](Self::begin_immediately).
    #[must_use]
    pub const fn begin_immediately(mut self) -> Self {
        self.begin_immediately = true;
        self
    }
}

/// The time a task may still spend in the current cycle.
pub struct Budget<'a> {
    deadline: HostTime,
    timing: &'a dyn TimingSource,
}

impl fmt::Debug for Budget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Budget")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl<'a> Budget<'a> {
    /// A budget that runs out at `deadline` on `timing`'s clock.
    #[must_use]
    pub fn new(timing: &'a dyn TimingSource, deadline: HostTime) -> Self {
        Self { deadline, timing }
    }

    /// Current host time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.timing.now()
    }

    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(self.timing.now())
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.timing.now() >= self.deadline
    }
}

/// A unit of cooperative work.
pub trait Task {
    /// Performs some work, checking `budget` often enough to stop close to
    /// the deadline.
    ///
    /// # Errors
    ///
    /// Whatever the work fails with; the error propagates out of the tick.
    fn step(&mut self, budget: &Budget<'_>) -> SwatchResult<TaskStatus>;
}

/// Adapter returned by [`from_fn`].
pub struct FromFn<F> {
    f: F,
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Wraps a step closure as a [`Task`].
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(&Budget<'_>) -> SwatchResult<TaskStatus>,
{
    FromFn { f }
}

impl<F> Task for FromFn<F>
where
    F: FnMut(&Budget<'_>) -> SwatchResult<TaskStatus>,
{
    fn step(&mut self, budget: &Budget<'_>) -> SwatchResult<TaskStatus> {
        (self.f)(budget)
    }
}

/// Adapter returned by [`once`].
pub struct Once<F> {
    f: Option<F>,
}

impl<F> fmt::Debug for Once<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Once")
            .field("spent", &self.f.is_none())
            .finish()
    }
}

/// Wraps a one-shot callback as a single-step [`Task`] that always reports
/// [`TaskStatus::Done`].
pub fn once<F>(f: F) -> Once<F>
where
    F: FnOnce() -> SwatchResult<()>,
{
    Once { f: Some(f) }
}

impl<F> Task for Once<F>
where
    F: FnOnce() -> SwatchResult<()>,
{
    fn step(&mut self, _: &Budget<'_>) -> SwatchResult<TaskStatus> {
        if let Some(f) = self.f.take() {
            f()?;
        }
        Ok(TaskStatus::Done)
    }
}

/// Scheduler tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Length of one work slice, in milliseconds.
    pub max_work_ms: f64,
    /// Delay before the timeout-aligned tick, in milliseconds.
    pub timeout_delay_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_millis(20.0, 20.0)
    }
}

impl SchedulerConfig {
    /// Builds a config from a work slice and timeout delay in milliseconds.
    #[must_use]
    pub const fn from_millis(max_work_ms: f64, timeout_delay_ms: f64) -> Self {
        Self {
            max_work_ms,
            timeout_delay_ms,
        }
    }
}

struct Entry {
    id: TaskId,
    options: TaskOptions,
    task: Box<dyn Task>,
}

#[derive(Default)]
struct CycleStats {
    run: u32,
    requeued: u32,
}

/// Clears the "performing work" flag however the cycle ends.
struct PerformingGuard<'a>(&'a Cell<bool>);

impl Drop for PerformingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Cooperative task queue. See the [module docs](self).
///
/// All methods take `&self` so the scheduler can be shared through an
/// [`Rc`] between the host's timer callbacks and the tasks themselves.
pub struct WorkScheduler {
    timing: Rc<dyn TimingSource>,
    max_work_time: Duration,
    timeout_delay: Duration,
    present: RefCell<VecDeque<Entry>>,
    future: RefCell<VecDeque<Entry>>,
    performing: Cell<bool>,
    enabled: Cell<bool>,
    frame_timer: Cell<Option<TimerId>>,
    timeout_timer: Cell<Option<TimerId>>,
    next_id: Cell<u64>,
    tracer: RefCell<Tracer>,
}

impl fmt::Debug for WorkScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkScheduler")
            .field("queued", &self.queued_len())
            .field("performing", &self.performing.get())
            .field("enabled", &self.enabled.get())
            .finish_non_exhaustive()
    }
}

impl WorkScheduler {
    /// Creates an enabled scheduler with an empty queue.
    #[must_use]
    pub fn new(timing: Rc<dyn TimingSource>, config: SchedulerConfig) -> Self {
        let timebase = timing.timebase();
        Self {
            max_work_time: Duration::from_millis(config.max_work_ms, timebase),
            timeout_delay: Duration::from_millis(config.timeout_delay_ms, timebase),
            timing,
            present: RefCell::new(VecDeque::new()),
            future: RefCell::new(VecDeque::new()),
            performing: Cell::new(false),
            enabled: Cell::new(true),
            frame_timer: Cell::new(None),
            timeout_timer: Cell::new(None),
            next_id: Cell::new(0),
            tracer: RefCell::new(Tracer::none()),
        }
    }

    /// The timing source driving this scheduler.
    #[must_use]
    pub fn timing(&self) -> &Rc<dyn TimingSource> {
        &self.timing
    }

    /// Mints a fresh task identity.
    pub fn next_task_id(&self) -> TaskId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        TaskId(id)
    }

    /// Installs a trace sink for work-cycle events.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        *self.tracer.borrow_mut() = Tracer::new(sink);
    }

    pub(crate) fn with_tracer(&self, f: impl FnOnce(&mut Tracer)) {
        if let Ok(mut tracer) = self.tracer.try_borrow_mut() {
            f(&mut tracer);
        }
    }

    /// Queues `task` under `id` unless a task with that id is already queued.
    ///
    /// Returns whether the task was queued.
    pub fn schedule_task(&self, id: TaskId, options: TaskOptions, task: impl Task + 'static) -> bool {
        if self.is_scheduled(id) {
            return false;
        }
        let entry = Entry {
            id,
            options,
            task: Box::new(task),
        };
        if self.performing.get() && !options.begin_immediately {
            self.future.borrow_mut().push_back(entry);
        } else {
            self.present.borrow_mut().push_back(entry);
        }
        if !self.performing.get() {
            self.ensure_timers();
        }
        true
    }

    /// Replaces any queued task with this id by `task`.
    pub fn schedule_unique_task(&self, id: TaskId, options: TaskOptions, task: impl Task + 'static) {
        self.unschedule_task(id);
        self.schedule_task(id, options, task);
    }

    /// Removes the queued task with this id. A no-op if none is queued.
    ///
    /// Returns whether a task was removed.
    pub fn unschedule_task(&self, id: TaskId) -> bool {
        let mut removed = false;
        for queue in [&self.present, &self.future] {
            let mut queue = queue.borrow_mut();
            let before = queue.len();
            queue.retain(|e| e.id != id);
            removed |= queue.len() != before;
        }
        removed
    }

    /// Whether a task with this id is queued.
    #[must_use]
    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.present.borrow().iter().any(|e| e.id == id)
            || self.future.borrow().iter().any(|e| e.id == id)
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.present.borrow().len() + self.future.borrow().len()
    }

    /// Whether a work cycle is currently running.
    #[must_use]
    pub fn is_performing_work(&self) -> bool {
        self.performing.get()
    }

    /// Whether timers are requested for queued work.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Resumes requesting timers.
    pub fn enable(&self) {
        self.enabled.set(true);
        if !self.performing.get() {
            self.ensure_timers();
        }
    }

    /// Cancels outstanding timers. Queued tasks are kept.
    pub fn disable(&self) {
        self.enabled.set(false);
        self.cancel_timers();
    }

    /// Runs one work cycle right now.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Reentrant`] if called from inside a cycle, or the
    /// first error returned by a task.
    pub fn perform_work(&self) -> SwatchResult<()> {
        self.run_cycle(TickKind::Direct)
    }

    /// Handles the frame-aligned tick requested from the timing source.
    ///
    /// # Errors
    ///
    /// See [`perform_work`](Self::perform_work).
    pub fn on_frame_tick(&self) -> SwatchResult<()> {
        self.check_reentrancy()?;
        self.frame_timer.set(None);
        self.run_cycle(TickKind::Frame)
    }

    /// Handles the timeout-aligned tick requested from the timing source.
    ///
    /// # Errors
    ///
    /// See [`perform_work`](Self::perform_work).
    pub fn on_timeout_tick(&self) -> SwatchResult<()> {
        self.check_reentrancy()?;
        self.timeout_timer.set(None);
        self.run_cycle(TickKind::Timeout)
    }

    fn check_reentrancy(&self) -> Result<(), SchedulerError> {
        if self.performing.get() {
            tracing::warn!("work requested while a work cycle is running");
            return Err(SchedulerError::Reentrant);
        }
        Ok(())
    }

    fn run_cycle(&self, tick: TickKind) -> SwatchResult<()> {
        self.check_reentrancy()?;
        self.performing.set(true);
        let guard = PerformingGuard(&self.performing);

        let started_at = self.timing.now();
        let budget = Budget::new(&*self.timing, started_at.saturating_add(self.max_work_time));
        let mut stats = CycleStats::default();
        let result = self.drain(tick, &budget, &mut stats);
        drop(guard);

        {
            let mut future = self.future.borrow_mut();
            self.present.borrow_mut().extend(future.drain(..));
        }
        let queue_len = self.queued_len();
        tracing::trace!(?tick, tasks_run = stats.run, queue_len, "work cycle finished");
        self.with_tracer(|t| {
            t.work_cycle(&WorkCycleEvent {
                tick,
                started_at,
                finished_at: self.timing.now(),
                tasks_run: stats.run,
                tasks_requeued: stats.requeued,
                queue_len: u32::try_from(queue_len).unwrap_or(u32::MAX),
            });
        });

        if queue_len == 0 {
            self.cancel_timers();
        } else {
            self.ensure_timers();
        }
        result
    }

    fn drain(&self, tick: TickKind, budget: &Budget<'_>, stats: &mut CycleStats) -> SwatchResult<()> {
        let mut first = true;
        loop {
            // The first task always gets a step so a zero budget still makes progress.
            if !first && budget.is_exhausted() {
                return Ok(());
            }
            let Some(mut entry) = self.present.borrow_mut().pop_front() else {
                return Ok(());
            };
            if tick == TickKind::Timeout && entry.options.animation_only {
                self.future.borrow_mut().push_back(entry);
                stats.requeued += 1;
                continue;
            }
            first = false;

            stats.run += 1;
            let mut status = entry.task.step(budget)?;
            if !entry.options.run_until_done {
                continue;
            }
            while status == TaskStatus::Pending && !budget.is_exhausted() {
                stats.run += 1;
                status = entry.task.step(budget)?;
            }
            if status == TaskStatus::Pending && !self.is_scheduled(entry.id) {
                self.future.borrow_mut().push_back(entry);
                stats.requeued += 1;
            }
        }
    }

    fn ensure_timers(&self) {
        if !self.enabled.get() || self.queued_len() == 0 {
            return;
        }
        if self.frame_timer.get().is_none() {
            self.frame_timer.set(Some(self.timing.request_frame()));
        }
        if self.timeout_timer.get().is_none() {
            self.timeout_timer
                .set(Some(self.timing.set_timeout(self.timeout_delay)));
        }
    }

    fn cancel_timers(&self) {
        if let Some(id) = self.frame_timer.take() {
            self.timing.cancel_frame(id);
        }
        if let Some(id) = self.timeout_timer.take() {
            self.timing.clear_timeout(id);
        }
    }
}
