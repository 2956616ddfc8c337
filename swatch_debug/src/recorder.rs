// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and appends every event to a
//! `Vec<RecordedEvent>` in arrival order. Hand it to a scheduler wrapped in
//! `Rc<RefCell<_>>` to read the recording back while the scheduler lives.

use swatch_core::error::BatchKind;
use swatch_core::time::HostTime;
use swatch_core::trace::{BatchEvent, SpriteRemovedEvent, TraceSink, WorkCycleEvent};

/// One recorded trace event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// See [`TraceSink::on_work_cycle`].
    WorkCycle(WorkCycleEvent),
    /// See [`TraceSink::on_batch`].
    Batch(BatchEvent),
    /// See [`TraceSink::on_sprite_removed`].
    SpriteRemoved(SpriteRemovedEvent),
}

impl RecordedEvent {
    /// Host time the event is stamped with; work cycles use their start.
    #[must_use]
    pub fn timestamp(&self) -> HostTime {
        match self {
            Self::WorkCycle(e) => e.started_at,
            Self::Batch(e) => e.timestamp,
            Self::SpriteRemoved(e) => e.timestamp,
        }
    }
}

/// A [`TraceSink`] that keeps every event.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Batch steps of one kind, in order.
    pub fn batches(&self, kind: BatchKind) -> impl Iterator<Item = &BatchEvent> + '_ {
        self.events.iter().filter_map(move |e| match e {
            RecordedEvent::Batch(b) if b.kind == kind => Some(b),
            _ => None,
        })
    }

    /// Indices of removed sprites, in removal order.
    #[must_use]
    pub fn removed_indices(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::SpriteRemoved(r) => Some(r.index),
                _ => None,
            })
            .collect()
    }
}

impl TraceSink for RecorderSink {
    fn on_work_cycle(&mut self, e: &WorkCycleEvent) {
        self.events.push(RecordedEvent::WorkCycle(*e));
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        self.events.push(RecordedEvent::Batch(*e));
    }

    fn on_sprite_removed(&mut self, e: &SpriteRemovedEvent) {
        self.events.push(RecordedEvent::SpriteRemoved(*e));
    }
}
