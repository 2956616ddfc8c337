// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timing capability handed to the scheduler and coordinator.
//!
//! Nothing in this crate reads a global clock or registers a platform
//! timer on its own. Instead, hosts implement [`TimingSource`] and pass it in
//! at construction:
//!
//! - [`now`](TimingSource::now) reads the monotonic clock.
//! - [`request_frame`](TimingSource::request_frame) asks for one
//!   frame-aligned tick (e.g. `requestAnimationFrame`, a display link).
//! - [`set_timeout`](TimingSource::set_timeout) asks for one timeout-aligned
//!   tick, which keeps firing even when no frames are being produced.
//!
//! When a requested timer fires, the host calls
//! [`WorkScheduler::on_frame_tick`](crate::scheduler::WorkScheduler::on_frame_tick)
//! or [`WorkScheduler::on_timeout_tick`](crate::scheduler::WorkScheduler::on_timeout_tick).
//!
//! [`ManualTiming`] is a deterministic implementation for tests and headless
//! hosts: time only moves when told to, and timer requests are recorded so
//! the caller can decide when to "fire" them.

use core::cell::Cell;

use crate::time::{Duration, HostTime, Timebase};

/// Opaque identifier of a requested platform timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u32);

/// Which timing source triggered a unit of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// A frame-aligned tick; rendering work is appropriate.
    Frame,
    /// A timeout-aligned tick; runs even when frames are not produced.
    Timeout,
    /// Work was performed directly via
    /// [`WorkScheduler::perform_work`](crate::scheduler::WorkScheduler::perform_work).
    Direct,
}

/// Clock and timer capability.
pub trait TimingSource {
    /// Returns the current monotonic host time.
    fn now(&self) -> HostTime;

    /// Returns the timebase used by [`now`](Self::now).
    fn timebase(&self) -> Timebase;

    /// Requests a single frame-aligned tick.
    fn request_frame(&self) -> TimerId;

    /// Cancels a pending frame request.
    fn cancel_frame(&self, id: TimerId);

    /// Requests a single timeout-aligned tick after `delay`.
    fn set_timeout(&self, delay: Duration) -> TimerId;

    /// Cancels a pending timeout.
    fn clear_timeout(&self, id: TimerId);
}

/// A [`TimingSource`] whose clock only moves when told to.
///
/// Timer requests are recorded rather than scheduled. Callers inspect them
/// with [`pending_frame`](Self::pending_frame) and
/// [`pending_timeout`](Self::pending_timeout) and deliver the corresponding
/// tick to the scheduler themselves.
#[derive(Debug)]
pub struct ManualTiming {
    now: Cell<u64>,
    auto_advance: Cell<u64>,
    timebase: Timebase,
    next_id: Cell<u32>,
    frame: Cell<Option<TimerId>>,
    timeout: Cell<Option<(TimerId, Duration)>>,
    frames_requested: Cell<u32>,
}

impl Default for ManualTiming {
    fn default() -> Self {
        Self::new(Timebase::NANOS)
    }
}

impl ManualTiming {
    /// Creates a manual clock at tick zero with the given timebase.
    #[must_use]
    pub fn new(timebase: Timebase) -> Self {
        Self {
            now: Cell::new(0),
            auto_advance: Cell::new(0),
            timebase,
            next_id: Cell::new(1),
            frame: Cell::new(None),
            timeout: Cell::new(None),
            frames_requested: Cell::new(0),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by.ticks()));
    }

    /// Moves the clock forward by fractional milliseconds.
    pub fn advance_millis(&self, millis: f64) {
        self.advance(Duration::from_millis(millis, self.timebase));
    }

    /// Sets the clock to an absolute time.
    pub fn set_now(&self, now: HostTime) {
        self.now.set(now.ticks());
    }

    /// Makes every [`now`](TimingSource::now) call advance the clock by
    /// `step` after reading it. Used to exhaust work budgets
    /// deterministically.
    pub fn set_auto_advance(&self, step: Duration) {
        self.auto_advance.set(step.ticks());
    }

    /// Returns the outstanding frame request, if any.
    #[must_use]
    pub fn pending_frame(&self) -> Option<TimerId> {
        self.frame.get()
    }

    /// Returns the outstanding timeout request and its delay, if any.
    #[must_use]
    pub fn pending_timeout(&self) -> Option<(TimerId, Duration)> {
        self.timeout.get()
    }

    /// Consumes the outstanding frame request, as a host does when the
    /// frame callback fires. Returns whether one was pending.
    pub fn fire_frame(&self) -> bool {
        self.frame.take().is_some()
    }

    /// Consumes the outstanding timeout request. Returns whether one was
    /// pending.
    pub fn fire_timeout(&self) -> bool {
        self.timeout.take().is_some()
    }

    /// Total number of frame requests made so far.
    #[must_use]
    pub fn frames_requested(&self) -> u32 {
        self.frames_requested.get()
    }

    fn mint(&self) -> TimerId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        TimerId(id)
    }
}

impl TimingSource for ManualTiming {
    fn now(&self) -> HostTime {
        let now = self.now.get();
        self.now.set(now.saturating_add(self.auto_advance.get()));
        HostTime(now)
    }

    fn timebase(&self) -> Timebase {
        self.timebase
    }

    fn request_frame(&self) -> TimerId {
        let id = self.mint();
        self.frame.set(Some(id));
        self.frames_requested.set(self.frames_requested.get() + 1);
        id
    }

    fn cancel_frame(&self, id: TimerId) {
        if self.frame.get() == Some(id) {
            self.frame.set(None);
        }
    }

    fn set_timeout(&self, delay: Duration) -> TimerId {
        let id = self.mint();
        self.timeout.set(Some((id, delay)));
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        if matches!(self.timeout.get(), Some((pending, _)) if pending == id) {
            self.timeout.set(None);
        }
    }
}
