// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graphics backend contract.
//!
//! The [`Coordinator`](crate::coordinator::Coordinator) owns the CPU-side
//! swatch arena. A *backend* owns everything GPU-side: the target and
//! previous data textures, the rebase and hit-test passes, and the draw
//! call. The coordinator only talks to it through [`GraphicsBackend`].
//!
//! # Texture layout
//!
//! The layout computed by [`AttributeMapper`] is a private contract between
//! the coordinator and its backend. Swatch `i` lives in row
//! `i / swatches_per_row`, starting at texel `(i % swatches_per_row) *
//! texels_per_swatch`. Uploads always cover whole rows.
//!
//! # Passes
//!
//! - **Rebase** evaluates, for each listed swatch, the instantaneous value
//!   and first derivative of every interpolable channel at the given time,
//!   and stores them as the swatch's new *previous* values (and deltas). A
//!   transition that starts afterwards blends from where the sprite really
//!   is, at the velocity it really has.
//! - **Hit test** reports, per swatch, whether the sprite's current bounds
//!   intersect a rectangle.
//!
//! Backend crates depend on `swatch_core` and implement the trait; the
//! reference implementation is `swatch_backend_cpu`.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::attributes::AttributeMapper;
use crate::error::BackendError;

/// Query passed to [`GraphicsBackend::run_hit_test_pass`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitTestParameters {
    /// Query rectangle in world coordinates.
    pub rect: Rect,
    /// Whether touching edges count as a hit.
    pub inclusive: bool,
}

impl HitTestParameters {
    /// A query for the rectangle at `(x, y)` with the given size.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64, inclusive: bool) -> Self {
        Self {
            rect: Rect::new(x, y, x + width, y + height),
            inclusive,
        }
    }
}

/// GPU-side half of the sprite arena.
///
/// All methods are called from inside coordinator batches, one at a time.
pub trait GraphicsBackend {
    /// Allocates textures for `mapper`'s layout. Called once, before any
    /// other method.
    fn configure(&mut self, mapper: &AttributeMapper);

    /// Replaces `height` whole rows of the target texture, starting at
    /// `row_index`. `data` holds `width * height * data_channel_count`
    /// floats.
    fn upload_swatch_rows(&mut self, row_index: usize, width: usize, height: usize, data: &[f32]);

    /// Captures the interpolated state of each swatch in `swatch_uvs` at
    /// `elapsed_ms` into the previous texture.
    fn run_rebase_pass(&mut self, swatch_uvs: &[[f32; 2]], elapsed_ms: f32);

    /// Tests the first `instance_count` swatches against `params` at
    /// `elapsed_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the pass cannot run.
    fn run_hit_test_pass(
        &mut self,
        params: &HitTestParameters,
        instance_count: usize,
        elapsed_ms: f32,
    ) -> Result<Vec<bool>, BackendError>;

    /// Draws the first `instance_count` swatches at `elapsed_ms`.
    fn draw(&mut self, instance_count: usize, elapsed_ms: f32);
}
