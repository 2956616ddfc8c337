// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software graphics backend for swatch sprite arenas.
//!
//! [`CpuBackend`] implements [`GraphicsBackend`] with two CPU-side float
//! textures laid out exactly like the GPU ones would be:
//!
//! - the **target** store receives row uploads from the coordinator;
//! - the **previous** store holds where each sprite was, and how fast it
//!   was moving, when its current transition began.
//!
//! Every interpolable channel is evaluated as a Hermite [`Segment`] from the
//! previous store to the target store. The rebase pass samples that segment
//! at the rebase time and writes value and velocity back into the previous
//! store, so a new target picks up exactly where the sprite was.
//!
//! Hosts without a GPU can read interpolated values with
//! [`CpuBackend::value_at`]; tests use the backend as the reference
//! implementation of the contract.

mod hermite;

pub use hermite::Segment;

use std::collections::BTreeSet;

use kurbo::{Rect, Size};
use swatch_core::attributes::{AttributeMapper, TRANSITION_TIME_MS};
use swatch_core::backend::{GraphicsBackend, HitTestParameters};
use swatch_core::error::BackendError;

/// An interpolable value channel and its velocity channel.
#[derive(Clone, Copy, Debug)]
struct Lane {
    value: usize,
    delta: usize,
}

/// Channel offsets resolved once per [`configure`](GraphicsBackend::configure).
#[derive(Clone, Debug)]
struct Layout {
    mapper: AttributeMapper,
    lanes: Vec<Lane>,
    /// Non-interpolable value channels other than the transition time.
    copied: Vec<usize>,
    transition: Option<usize>,
    bounds: Option<[usize; 4]>,
}

impl Layout {
    fn new(mapper: &AttributeMapper) -> Self {
        let count = mapper.component_count();
        let lanes: Vec<Lane> = (0..count)
            .filter_map(|value| {
                mapper
                    .delta_index(value)
                    .map(|delta| Lane { value, delta })
            })
            .collect();
        let deltas: BTreeSet<usize> = lanes.iter().map(|l| l.delta).collect();
        let transition = mapper.component_index(TRANSITION_TIME_MS);
        let copied = (0..count)
            .filter(|&i| !mapper.is_interpolable(i) && !deltas.contains(&i))
            .filter(|&i| Some(i) != transition)
            .collect();
        let bounds = ["PositionWorldX", "PositionWorldY", "SizeWorldWidth", "SizeWorldHeight"]
            .map(|name| mapper.component_index(name));
        let bounds = match bounds {
            [Some(x), Some(y), Some(w), Some(h)] => Some([x, y, w, h]),
            _ => None,
        };
        Self {
            mapper: mapper.clone(),
            lanes,
            copied,
            transition,
            bounds,
        }
    }
}

/// Counters for what the coordinator asked of the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BackendStats {
    /// Calls to `upload_swatch_rows`.
    pub uploads: usize,
    /// Texture rows written by those calls.
    pub rows_uploaded: usize,
    /// Calls to `run_rebase_pass`.
    pub rebase_passes: usize,
    /// Swatches captured by those passes.
    pub swatches_rebased: usize,
    /// Calls to `run_hit_test_pass`.
    pub hit_tests: usize,
    /// Calls to `draw`.
    pub draws: usize,
    /// Arguments of the latest `draw`: instance count and elapsed time.
    pub last_draw: Option<(usize, f32)>,
}

/// A [`GraphicsBackend`] that keeps both textures in memory.
#[derive(Debug, Default)]
pub struct CpuBackend {
    layout: Option<Layout>,
    target: Vec<f32>,
    previous: Vec<f32>,
    stats: BackendStats,
}

impl CpuBackend {
    /// Creates an unconfigured backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What has been asked of the backend so far.
    #[must_use]
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// The target store as last uploaded.
    #[must_use]
    pub fn target(&self) -> &[f32] {
        &self.target
    }

    /// The previous store as last rebased.
    #[must_use]
    pub fn previous(&self) -> &[f32] {
        &self.previous
    }

    /// Uploaded target values of swatch `index`.
    #[must_use]
    pub fn target_swatch(&self, index: usize) -> Option<&[f32]> {
        let vps = self.layout.as_ref()?.mapper.values_per_swatch();
        self.target.get(index * vps..(index + 1) * vps)
    }

    /// The transition of value channel `component` of swatch `index`.
    ///
    /// `None` for unknown swatches and non-interpolable channels.
    #[must_use]
    pub fn segment(&self, index: usize, component: usize) -> Option<Segment> {
        let layout = self.layout.as_ref()?;
        let delta = layout.mapper.delta_index(component)?;
        let tt = layout.transition?;
        let base = index * layout.mapper.values_per_swatch();
        let previous = self.previous.get(base..)?;
        let target = self.target.get(base..)?;
        Some(Segment {
            start: *previous.get(component)?,
            start_velocity: *previous.get(delta)?,
            end: *target.get(component)?,
            start_ms: *previous.get(tt)?,
            end_ms: *target.get(tt)?,
        })
    }

    /// Value of the named channel of swatch `index` at `elapsed_ms`, as a
    /// shader would compute it.
    #[must_use]
    pub fn value_at(&self, index: usize, component: &str, elapsed_ms: f32) -> Option<f32> {
        let layout = self.layout.as_ref()?;
        let channel = layout.mapper.component_index(component)?;
        match self.segment(index, channel) {
            Some(segment) => Some(segment.sample(elapsed_ms).0),
            None => self.target_swatch(index)?.get(channel).copied(),
        }
    }

    /// Velocity of the named interpolable channel of swatch `index` at
    /// `elapsed_ms`, per millisecond.
    #[must_use]
    pub fn velocity_at(&self, index: usize, component: &str, elapsed_ms: f32) -> Option<f32> {
        let channel = self.layout.as_ref()?.mapper.component_index(component)?;
        Some(self.segment(index, channel)?.sample(elapsed_ms).1)
    }

    /// World-space bounds of swatch `index` at `elapsed_ms`.
    fn bounds_at(&self, index: usize, elapsed_ms: f32) -> Option<Rect> {
        let [x, y, w, h] = self.layout.as_ref()?.bounds?;
        let sample = |channel| {
            self.segment(index, channel)
                .map(|s| f64::from(s.sample(elapsed_ms).0))
        };
        let size = Size::new(sample(w)?.abs(), sample(h)?.abs());
        Some(Rect::from_center_size((sample(x)?, sample(y)?), size))
    }

    fn rebase_swatch(&mut self, index: usize, elapsed_ms: f32) {
        let Some(layout) = self.layout.as_ref() else {
            return;
        };
        let samples: Vec<(Lane, (f32, f32))> = layout
            .lanes
            .iter()
            .filter_map(|&lane| {
                self.segment(index, lane.value)
                    .map(|s| (lane, s.sample(elapsed_ms)))
            })
            .collect();
        let base = index * layout.mapper.values_per_swatch();
        for &channel in &layout.copied {
            self.previous[base + channel] = self.target[base + channel];
        }
        for (lane, (value, velocity)) in samples {
            self.previous[base + lane.value] = value;
            self.previous[base + lane.delta] = velocity;
        }
        if let Some(tt) = layout.transition {
            self.previous[base + tt] = elapsed_ms;
        }
    }
}

impl GraphicsBackend for CpuBackend {
    fn configure(&mut self, mapper: &AttributeMapper) {
        let len = mapper.total_swatches() * mapper.values_per_swatch();
        self.target = vec![0.0; len];
        self.previous = vec![0.0; len];
        self.layout = Some(Layout::new(mapper));
        self.stats = BackendStats::default();
        tracing::debug!(
            width = mapper.texture_width(),
            height = mapper.texture_height(),
            "cpu textures allocated"
        );
    }

    fn upload_swatch_rows(&mut self, row_index: usize, width: usize, height: usize, data: &[f32]) {
        let Some(layout) = self.layout.as_ref() else {
            tracing::warn!("upload before configure ignored");
            return;
        };
        let channels = layout.mapper.data_channel_count();
        let start = row_index * layout.mapper.values_per_row();
        let len = width * height * channels;
        let Some(dst) = self.target.get_mut(start..start + len) else {
            tracing::warn!(row_index, height, "upload outside the texture ignored");
            return;
        };
        if data.len() != len {
            tracing::warn!(expected = len, actual = data.len(), "upload size mismatch ignored");
            return;
        }
        dst.copy_from_slice(data);
        self.stats.uploads += 1;
        self.stats.rows_uploaded += height;
    }

    fn run_rebase_pass(&mut self, swatch_uvs: &[[f32; 2]], elapsed_ms: f32) {
        self.stats.rebase_passes += 1;
        for &uv in swatch_uvs {
            let index = self
                .layout
                .as_ref()
                .and_then(|l| l.mapper.swatch_index_for_uv(uv));
            match index {
                Some(index) => {
                    self.rebase_swatch(index, elapsed_ms);
                    self.stats.swatches_rebased += 1;
                }
                None => tracing::warn!(?uv, "rebase of unknown swatch ignored"),
            }
        }
    }

    fn run_hit_test_pass(
        &mut self,
        params: &HitTestParameters,
        instance_count: usize,
        elapsed_ms: f32,
    ) -> Result<Vec<bool>, BackendError> {
        self.stats.hit_tests += 1;
        let Some(layout) = self.layout.as_ref() else {
            return Err(BackendError("hit test before configure".into()));
        };
        if layout.bounds.is_none() {
            return Err(BackendError(
                "layout has no PositionWorld and SizeWorld channels".into(),
            ));
        }
        let query = params.rect.abs();
        Ok((0..instance_count)
            .map(|index| {
                self.bounds_at(index, elapsed_ms)
                    .is_some_and(|bounds| overlaps(bounds, query, params.inclusive))
            })
            .collect())
    }

    fn draw(&mut self, instance_count: usize, elapsed_ms: f32) {
        self.stats.draws += 1;
        self.stats.last_draw = Some((instance_count, elapsed_ms));
    }
}

fn overlaps(a: Rect, b: Rect, inclusive: bool) -> bool {
    if inclusive {
        a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
    } else {
        a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
    }
}
