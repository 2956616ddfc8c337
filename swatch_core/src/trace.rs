// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured diagnostics for work cycles and sprite batches.
//!
//! The [`TraceSink`] trait has one method per event kind, each defaulting to
//! a no-op. The scheduler emits a [`WorkCycleEvent`] after every work cycle;
//! the coordinator emits a [`BatchEvent`] after every batch step and a
//! [`SpriteRemovedEvent`] whenever a sprite reaches `Removed`.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Free-form log lines go through the `tracing` crate instead; this module
//! is for events a tool may want to aggregate.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::error::BatchKind;
use crate::time::HostTime;
use crate::timing::TickKind;

/// Emitted by the scheduler when a work cycle finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkCycleEvent {
    /// What triggered the cycle.
    pub tick: TickKind,
    /// Host time when the cycle began.
    pub started_at: HostTime,
    /// Host time when the cycle ended.
    pub finished_at: HostTime,
    /// Task invocations made during the cycle.
    pub tasks_run: u32,
    /// Tasks pushed into the next cycle (budget ran out or deferred).
    pub tasks_requeued: u32,
    /// Length of the queue after the cycle.
    pub queue_len: u32,
}

/// Emitted by the coordinator after one step of a batch operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchEvent {
    /// Which batch ran.
    pub kind: BatchKind,
    /// Sprites (or swatch rows) handled in this step.
    pub processed: u32,
    /// Whether the batch drained its range.
    pub completed: bool,
    /// Host time at the end of the step.
    pub timestamp: HostTime,
}

/// Emitted when a sprite reaches `Removed` and its swatch becomes reusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteRemovedEvent {
    /// The swatch that was freed.
    pub index: usize,
    /// Host time of the removal.
    pub timestamp: HostTime,
}

/// Receives trace events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when the scheduler finishes a work cycle.
    fn on_work_cycle(&mut self, e: &WorkCycleEvent) {
        _ = e;
    }

    /// Called when a batch step finishes.
    fn on_batch(&mut self, e: &BatchEvent) {
        _ = e;
    }

    /// Called when a sprite is removed.
    fn on_sprite_removed(&mut self, e: &SpriteRemovedEvent) {
        _ = e;
    }
}

/// Lets a caller keep a handle to a sink after handing it to a [`Tracer`].
impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_work_cycle(&mut self, e: &WorkCycleEvent) {
        self.borrow_mut().on_work_cycle(e);
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.borrow_mut().on_batch(e);
    }

    fn on_sprite_removed(&mut self, e: &SpriteRemovedEvent) {
        self.borrow_mut().on_sprite_removed(e);
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Owning wrapper around an optional [`TraceSink`].
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Whether events are actually delivered anywhere.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`WorkCycleEvent`].
    #[inline]
    pub fn work_cycle(&mut self, e: &WorkCycleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_work_cycle(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BatchEvent`].
    #[inline]
    pub fn batch(&mut self, e: &BatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_batch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SpriteRemovedEvent`].
    #[inline]
    pub fn sprite_removed(&mut self, e: &SpriteRemovedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sprite_removed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}
