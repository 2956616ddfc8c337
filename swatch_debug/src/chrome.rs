// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] turns events collected by a
//! [`RecorderSink`](super::recorder::RecorderSink) into [Chrome Trace Event
//! Format][format] JSON.
//!
//! Work cycles become complete (`"X"`) slices on thread 0 so their duration
//! is visible; batch steps and removals are instant events on thread 1.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use swatch_core::time::{HostTime, Timebase};

use crate::recorder::RecordedEvent;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(
    events: &[RecordedEvent],
    timebase: Timebase,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let us = |t: HostTime| timebase.ticks_to_micros(t.ticks());
    let trace: Vec<Value> = events
        .iter()
        .map(|recorded| match recorded {
            RecordedEvent::WorkCycle(e) => json!({
                "ph": "X",
                "name": format!("{:?}", e.tick),
                "cat": "Scheduler",
                "ts": us(e.started_at),
                "dur": timebase.ticks_to_micros(e.finished_at.saturating_duration_since(e.started_at).ticks()),
                "pid": 0,
                "tid": 0,
                "args": {
                    "tasks_run": e.tasks_run,
                    "tasks_requeued": e.tasks_requeued,
                    "queue_len": e.queue_len,
                }
            }),
            RecordedEvent::Batch(e) => json!({
                "ph": "i",
                "name": format!("{:?}", e.kind),
                "cat": "Batch",
                "ts": us(e.timestamp),
                "pid": 0,
                "tid": 1,
                "s": "t",
                "args": {
                    "processed": e.processed,
                    "completed": e.completed,
                }
            }),
            RecordedEvent::SpriteRemoved(e) => json!({
                "ph": "i",
                "name": "SpriteRemoved",
                "cat": "Sprite",
                "ts": us(e.timestamp),
                "pid": 0,
                "tid": 1,
                "s": "t",
                "args": {
                    "index": e.index,
                }
            }),
        })
        .collect();

    serde_json::to_writer_pretty(writer, &trace)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use swatch_core::error::BatchKind;
    use swatch_core::timing::TickKind;
    use swatch_core::trace::{BatchEvent, SpriteRemovedEvent, TraceSink, WorkCycleEvent};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_batch(&BatchEvent {
            kind: BatchKind::TextureSync,
            processed: 4,
            completed: true,
            timestamp: HostTime(1_500_000),
        });
        rec.on_sprite_removed(&SpriteRemovedEvent {
            index: 2,
            timestamp: HostTime(1_600_000),
        });
        rec.on_work_cycle(&WorkCycleEvent {
            tick: TickKind::Frame,
            started_at: HostTime(1_000_000),
            finished_at: HostTime(3_000_000),
            tasks_run: 3,
            tasks_requeued: 1,
            queue_len: 1,
        });

        let mut out = Vec::new();
        export(rec.events(), Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3, "one trace event per record");

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "TextureSync");
        assert_eq!(parsed[0]["ts"], 1500.0);

        assert_eq!(parsed[1]["name"], "SpriteRemoved");
        assert_eq!(parsed[1]["args"]["index"], 2);

        assert_eq!(parsed[2]["ph"], "X");
        assert_eq!(parsed[2]["name"], "Frame");
        assert_eq!(parsed[2]["dur"], 2000.0, "cycle duration in microseconds");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty(), "no events, empty array");
    }
}
