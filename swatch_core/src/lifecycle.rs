// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprite lifecycle phases and their allow-listed transitions.
//!
//! ```text
//!   Created          -> Rest | Removed (abandoned before assignment)
//!   Rest             -> HasCallback | NeedsTextureSync (elapsed exit)
//!   HasCallback      -> NeedsRebase | NeedsTextureSync
//!   NeedsRebase      -> NeedsTextureSync
//!   NeedsTextureSync -> Rest | HasCallback | Removed
//!   Removed          -> (terminal)
//! ```
//!
//! Target values reach the backend only at `NeedsTextureSync`; `NeedsRebase`
//! is entered only by sprites whose arrival lies in the future; and removal
//! always passes through a texture sync that has flashed zeros, so a
//! recycled swatch never shows its previous occupant.

use crate::error::LifecycleError;

/// The phase a sprite is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Created but not yet assigned a swatch (possibly waiting).
    Created,
    /// Owns a swatch and has nothing pending.
    Rest,
    /// At least one enter/update/exit callback is pending.
    HasCallback,
    /// A callback set an arrival time in the future; the in-flight
    /// interpolation state must be captured before the new target is synced.
    NeedsRebase,
    /// Target values are ready to be flashed to the backend.
    NeedsTextureSync,
    /// Terminal. The swatch, if any, may be recycled.
    Removed,
}

impl LifecyclePhase {
    /// Every phase, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Created,
        Self::Rest,
        Self::HasCallback,
        Self::NeedsRebase,
        Self::NeedsTextureSync,
        Self::Removed,
    ];

    /// Whether `self -> next` is in the allow-list.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Rest | Self::Removed)
                | (Self::Rest, Self::HasCallback | Self::NeedsTextureSync)
                | (Self::HasCallback, Self::NeedsRebase | Self::NeedsTextureSync)
                | (Self::NeedsRebase, Self::NeedsTextureSync)
                | (
                    Self::NeedsTextureSync,
                    Self::Rest | Self::HasCallback | Self::Removed
                )
        )
    }

    /// Moves to `next`, failing without side effects if the edge is not
    /// allowed.
    pub fn transition_to(&mut self, next: Self) -> Result<(), LifecycleError> {
        if !self.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}
