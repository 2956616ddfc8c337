// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host clock values and the elapsed-millisecond bridge.
//!
//! The scheduler budgets work in integer host ticks: [`HostTime`] for
//! instants, [`Duration`] for spans, and a [`Timebase`] saying how long a
//! tick is. Swatches, on the other hand, store transition times as `f32`
//! milliseconds since the coordinator was built, since that is what the
//! shaders compare against. [`HostTime::millis_since`] and
//! [`Duration::from_millis`] cross between the two.

use core::fmt;

const NANOS_PER_MILLI: f64 = 1_000_000.0;
const NANOS_PER_MICRO: f64 = 1_000.0;

/// Length of one host tick, as the ratio `numer / denom` nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Nanoseconds per `denom` ticks.
    pub numer: u32,
    /// Ticks per `numer` nanoseconds.
    pub denom: u32,
}

impl Timebase {
    /// One tick per nanosecond.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// One tick per microsecond.
    pub const MICROS: Self = Self {
        numer: 1_000,
        denom: 1,
    };

    /// Builds a timebase from a tick ratio.
    ///
    /// # Panics
    ///
    /// Panics if either part of the ratio is zero.
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(numer != 0 && denom != 0, "timebase ratio must be non-zero");
        Self { numer, denom }
    }

    /// Nanoseconds covered by `ticks`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "widened to u128 for the multiply; results past u64::MAX nanoseconds are not meaningful"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        (ticks as u128 * self.numer as u128 / self.denom as u128) as u64
    }

    /// Ticks covering `nanos`, rounded down.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "widened to u128 for the multiply; results past u64::MAX ticks are not meaningful"
    )]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        (nanos as u128 * self.denom as u128 / self.numer as u128) as u64
    }

    /// Fractional microseconds covered by `ticks`, for diagnostics.
    #[must_use]
    pub fn ticks_to_micros(self, ticks: u64) -> f64 {
        self.ticks_to_nanos(ticks) as f64 / NANOS_PER_MICRO
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

/// An instant on the host's monotonic clock, in ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Raw tick count.
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Span from `earlier` to `self`; zero when `earlier` is later.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// `self` moved forward by `by`, clamped to the end of the clock.
    #[must_use]
    pub const fn saturating_add(self, by: Duration) -> Self {
        Self(self.0.saturating_add(by.0))
    }

    /// Fractional milliseconds from `epoch` to `self`, zero before `epoch`.
    #[must_use]
    pub fn millis_since(self, epoch: Self, timebase: Timebase) -> f64 {
        self.saturating_duration_since(epoch).to_millis(timebase)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// A span of host ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// No time at all.
    pub const ZERO: Self = Self(0);

    /// Raw tick count.
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Ticks covering `millis` fractional milliseconds.
    ///
    /// Negative and NaN spans become [`Duration::ZERO`].
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "non-negative by construction; sub-nanosecond precision is dropped"
    )]
    pub fn from_millis(millis: f64, timebase: Timebase) -> Self {
        if millis.is_nan() || millis <= 0.0 {
            return Self::ZERO;
        }
        Self(timebase.nanos_to_ticks((millis * NANOS_PER_MILLI) as u64))
    }

    /// Fractional milliseconds covered by this span.
    #[must_use]
    pub fn to_millis(self, timebase: Timebase) -> f64 {
        timebase.ticks_to_nanos(self.0) as f64 / NANOS_PER_MILLI
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length_in_nanosecond_ticks() {
        let d = Duration::from_millis(16.5, Timebase::NANOS);
        assert_eq!(d, Duration(16_500_000), "16.5 ms of nanosecond ticks");
        assert!(
            (d.to_millis(Timebase::NANOS) - 16.5).abs() < 1e-9,
            "converts back to 16.5 ms"
        );
    }

    #[test]
    fn elapsed_millis_on_a_microsecond_clock() {
        let tb = Timebase::MICROS;
        assert_eq!(Duration::from_millis(1000.0, tb), Duration(1_000_000));
        let epoch = HostTime(500);
        assert!(
            (HostTime(3_000).millis_since(epoch, tb) - 2.5).abs() < 1e-9,
            "2500 µs after the epoch"
        );
        assert_eq!(
            HostTime(100).millis_since(epoch, tb),
            0.0,
            "before the epoch reads as zero"
        );
    }

    #[test]
    fn unusable_millis_become_zero() {
        for millis in [-3.0, 0.0, f64::NAN] {
            assert_eq!(
                Duration::from_millis(millis, Timebase::NANOS),
                Duration::ZERO,
                "{millis} ms"
            );
        }
    }

    #[test]
    fn odd_ratios_stay_exact() {
        // 125/3 ns per tick, as on some mobile clocks.
        let tb = Timebase::new(125, 3);
        assert_eq!(tb.ticks_to_nanos(24_000_000), 1_000_000_000, "one second");
        assert_eq!(tb.nanos_to_ticks(1_000_000_000), 24_000_000, "and back");
        assert_eq!(Timebase::MICROS.ticks_to_micros(3), 3.0, "diagnostic units");
    }

    #[test]
    fn instants_saturate_at_clock_edges() {
        let t = HostTime(1_000);
        assert_eq!(t.saturating_duration_since(HostTime(400)), Duration(600));
        assert_eq!(t.saturating_duration_since(HostTime(1_500)), Duration::ZERO);
        assert_eq!(
            HostTime(u64::MAX).saturating_add(Duration(1)),
            HostTime(u64::MAX),
            "deadline clamps instead of wrapping"
        );
    }

    #[test]
    #[should_panic(expected = "timebase ratio must be non-zero")]
    fn zero_ratio_is_rejected() {
        let _ = Timebase::new(0, 1);
    }
}
