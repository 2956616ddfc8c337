// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Texture-backed sprite arena with cooperative, time-budgeted batch work.
//!
//! `swatch_core` keeps the attributes of many animated sprites in a single
//! float texture, one fixed-size *swatch* per sprite, and leaves the per-frame
//! interpolation to a graphics backend. It is `no_std` compatible (with
//! `alloc`) and single-threaded: handles share state through `Rc`, and all
//! work happens in tasks driven by one [`WorkScheduler`](scheduler::WorkScheduler).
//!
//! # Architecture
//!
//! ```text
//!   TimingSource (frame / timeout ticks)
//!       │
//!       ▼
//!   WorkScheduler ──► BatchTask ──► Coordinator arena ──► GraphicsBackend
//!       ▲                                 ▲
//!       │                                 │
//!   schedule_task()                 Sprite::enter/update/exit
//! ```
//!
//! **[`attributes`]**: Maps named sprite attributes onto swatch offsets and
//! texture coordinates.
//!
//! **[`lifecycle`]**: The phase state machine every sprite moves through,
//! with the allowed transitions checked at runtime.
//!
//! **[`range`]**: Lazily-widened numeric interval used to remember which
//! swatches a batch has to look at.
//!
//! **[`scheduler`]**: Cooperative FIFO task queue that stops each work cycle
//! when its time budget runs out.
//!
//! **[`coordinator`]**: The arena itself and its batches: assigning waiting
//! sprites, running callbacks, rebasing, syncing texture rows, removal and
//! hit testing.
//!
//! **[`sprite`]** and **[`view`]**: Application-facing handles and the
//! attribute view callbacks write through.
//!
//! **[`backend`]**: The [`GraphicsBackend`](backend::GraphicsBackend) trait.
//!
//! **[`timing`]** and **[`time`]**: Host clock abstraction and tick types.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! work-cycle instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod attributes;
pub mod backend;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod range;
pub mod scheduler;
pub mod sprite;
pub mod time;
pub mod timing;
pub mod trace;
pub mod view;
