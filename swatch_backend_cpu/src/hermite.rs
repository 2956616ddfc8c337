// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cubic Hermite transition segments.

/// One channel's transition from a start state to a target.
///
/// The curve leaves `start` with `start_velocity` (units per millisecond)
/// at `start_ms` and settles on `end` with zero velocity at `end_ms`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Value at `start_ms`.
    pub start: f32,
    /// Rate of change at `start_ms`, per millisecond.
    pub start_velocity: f32,
    /// Value from `end_ms` on.
    pub end: f32,
    /// Elapsed milliseconds at which the transition began.
    pub start_ms: f32,
    /// Elapsed milliseconds at which the transition arrives.
    pub end_ms: f32,
}

impl Segment {
    /// Value and velocity at `t` elapsed milliseconds.
    ///
    /// Before `start_ms` the segment holds its start state; from `end_ms` on
    /// it holds `end` at rest. A segment with no duration is always at its
    /// end.
    #[must_use]
    pub fn sample(&self, t: f32) -> (f32, f32) {
        let duration = self.end_ms - self.start_ms;
        if duration <= 0.0 || t >= self.end_ms {
            return (self.end, 0.0);
        }
        let s = ((t - self.start_ms) / duration).clamp(0.0, 1.0);
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let value = h00 * self.start + h10 * duration * self.start_velocity + h01 * self.end;

        let d00 = 6.0 * s2 - 6.0 * s;
        let d10 = 3.0 * s2 - 4.0 * s + 1.0;
        let d01 = -6.0 * s2 + 6.0 * s;
        let velocity =
            (d00 * self.start + d10 * duration * self.start_velocity + d01 * self.end) / duration;

        (value, velocity)
    }
}
