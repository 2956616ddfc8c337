// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use swatch_core::error::BatchKind;
use swatch_core::time::{HostTime, Timebase};
use swatch_core::timing::TickKind;
use swatch_core::trace::{BatchEvent, SpriteRemovedEvent, TraceSink, WorkCycleEvent};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn us(&self, t: HostTime) -> f64 {
        self.timebase.ticks_to_micros(t.ticks())
    }
}

fn tick_name(tick: TickKind) -> &'static str {
    match tick {
        TickKind::Frame => "frame",
        TickKind::Timeout => "timeout",
        TickKind::Direct => "direct",
    }
}

fn batch_name(kind: BatchKind) -> &'static str {
    match kind {
        BatchKind::AssignWaiting => "assign",
        BatchKind::RunCallbacks => "callbacks",
        BatchKind::Rebase => "rebase",
        BatchKind::TextureSync => "sync",
        BatchKind::Removal => "removal",
        BatchKind::Draw => "draw",
        BatchKind::HitTest => "hit-test",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_work_cycle(&mut self, e: &WorkCycleEvent) {
        let _ = writeln!(
            self.writer,
            "[cycle] {} at {:.1}µs took={:.1}µs run={} requeued={} queued={}",
            tick_name(e.tick),
            self.us(e.started_at),
            self.us(e.finished_at) - self.us(e.started_at),
            e.tasks_run,
            e.tasks_requeued,
            e.queue_len,
        );
    }

    fn on_batch(&mut self, e: &BatchEvent) {
        let state = if e.completed { "done" } else { "pending" };
        let _ = writeln!(
            self.writer,
            "[batch:{}] processed={} {state} at {:.1}µs",
            batch_name(e.kind),
            e.processed,
            self.us(e.timestamp),
        );
    }

    fn on_sprite_removed(&mut self, e: &SpriteRemovedEvent) {
        let _ = writeln!(
            self.writer,
            "[removed] index={} at {:.1}µs",
            e.index,
            self.us(e.timestamp),
        );
    }
}
