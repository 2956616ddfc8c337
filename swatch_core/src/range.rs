// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conservative `[low, high]` membership tracking.
//!
//! A [`NumericRange`] answers "which indices *might* need work?" in O(1)
//! space and O(1) update. Membership is a superset: every index that was
//! ever included lies within the bounds, but the bounds may also cover
//! indices that need nothing. Consumers scan the bounds and skip entries that
//! turn out not to be eligible.

/// An optional closed interval `[low, high]`.
///
/// The default range is undefined (empty).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumericRange<T = usize> {
    bounds: Option<(T, T)>,
}

impl<T> Default for NumericRange<T> {
    fn default() -> Self {
        Self { bounds: None }
    }
}

impl<T: Copy + PartialOrd> NumericRange<T> {
    /// Creates an undefined range.
    #[must_use]
    pub const fn new() -> Self {
        Self { bounds: None }
    }

    /// Creates a range covering `[low, high]`.
    ///
    /// An inverted pair produces an undefined range.
    #[must_use]
    pub fn from_bounds(low: T, high: T) -> Self {
        if low <= high {
            Self {
                bounds: Some((low, high)),
            }
        } else {
            Self::new()
        }
    }

    /// Whether the range holds any bound at all.
    #[inline]
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.bounds.is_some()
    }

    /// The lower bound, if defined.
    #[inline]
    #[must_use]
    pub fn low(&self) -> Option<T> {
        self.bounds.map(|(low, _)| low)
    }

    /// The upper bound, if defined.
    #[inline]
    #[must_use]
    pub fn high(&self) -> Option<T> {
        self.bounds.map(|(_, high)| high)
    }

    /// Both bounds, if defined.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Option<(T, T)> {
        self.bounds
    }

    /// Makes the range undefined.
    #[inline]
    pub fn clear(&mut self) {
        self.bounds = None;
    }

    /// Widens the range to include `value`, defining it if necessary.
    pub fn expand_to_include(&mut self, value: T) {
        self.bounds = Some(match self.bounds {
            None => (value, value),
            Some((low, high)) => (
                if value < low { value } else { low },
                if value > high { value } else { high },
            ),
        });
    }

    /// Clips the range to its intersection with `[low, high]`.
    ///
    /// If the two are disjoint the range becomes undefined. Truncation never
    /// grows a range.
    pub fn truncate_to_within(&mut self, low: T, high: T) {
        let Some((cur_low, cur_high)) = self.bounds else {
            return;
        };
        let new_low = if cur_low > low { cur_low } else { low };
        let new_high = if cur_high < high { cur_high } else { high };
        self.bounds = if new_low <= new_high {
            Some((new_low, new_high))
        } else {
            None
        };
    }

    /// Whether both ranges are defined and their intervals intersect.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self.bounds, other.bounds) {
            (Some((a_low, a_high)), Some((b_low, b_high))) => a_low <= b_high && b_low <= a_high,
            _ => false,
        }
    }

    /// Whether `value` lies within the bounds.
    #[must_use]
    pub fn contains(&self, value: T) -> bool {
        matches!(self.bounds, Some((low, high)) if low <= value && value <= high)
    }
}
