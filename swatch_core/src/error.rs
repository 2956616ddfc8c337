// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy.
//!
//! Every failure in this crate is synchronous and local: configuration
//! problems surface from constructors, lifecycle misuse from the call that
//! misused it, and bookkeeping bugs from the batch that noticed them. The
//! only asynchronous channel is the hit-test handle, which resolves to a
//! [`HitTestError`] on cancellation or backend failure.

use alloc::string::String;

use crate::lifecycle::LifecyclePhase;

/// Convenience result type used across the crate.
pub type SwatchResult<T> = Result<T, SwatchError>;

/// Invalid [`AttributeMapper`](crate::attributes::AttributeMapper) settings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Neither the texture size nor the desired capacity is bounded.
    #[error("either max_texture_size or desired_swatch_capacity must be finite")]
    Unbounded,

    /// Two attribute components map to the same channel name.
    #[error("attribute component name `{0}` is defined more than once")]
    DuplicateComponent(String),

    /// An attribute was declared with an empty name.
    #[error("attribute names must not be empty")]
    EmptyAttributeName,

    /// `data_channel_count` was zero.
    #[error("data_channel_count must be at least 1")]
    NoDataChannels,

    /// `desired_swatch_capacity` was zero.
    #[error("desired_swatch_capacity must be at least 1")]
    ZeroCapacity,

    /// The texture cannot hold even a single swatch per row.
    #[error("max_texture_size {max_texture_size} cannot fit a {texels_per_swatch}-texel swatch")]
    TextureTooSmall {
        /// Configured maximum texture edge length, in texels.
        max_texture_size: usize,
        /// Texels needed by one swatch.
        texels_per_swatch: usize,
    },
}

/// Illegal lifecycle transition or invalid use of the sprite API.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// The transition is not in the allow-list.
    #[error("illegal lifecycle transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Phase the sprite was in.
        from: LifecyclePhase,
        /// Phase that was requested.
        to: LifecyclePhase,
    },

    /// `abandon` was called on a sprite that was already abandoned.
    #[error("sprite has already been abandoned")]
    AlreadyAbandoned,

    /// `abandon` was called on a sprite that already owns a swatch.
    #[error("cannot abandon a sprite that has been assigned a swatch; use exit instead")]
    AlreadyAssigned,

    /// A callback was registered on a sprite that has been removed.
    #[error("cannot register a callback on a removed sprite")]
    SpriteRemoved,

    /// The owning coordinator has been dropped.
    #[error("the coordinator owning this sprite no longer exists")]
    Detached,
}

/// Misuse of the [`WorkScheduler`](crate::scheduler::WorkScheduler).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// Work was requested while work was already executing.
    #[error("work requested while a work cycle is already running")]
    Reentrant,
}

/// Lookup of an unknown attribute or channel by name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// No channel with this name exists in the layout.
    #[error("unknown attribute component `{0}`")]
    UnknownComponent(String),

    /// No attribute with this name exists in the layout.
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    /// The number of values does not match the attribute's components.
    #[error("attribute `{name}` has {expected} components, got {actual} values")]
    Arity {
        /// Attribute name.
        name: String,
        /// Components declared by the attribute.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },
}

/// Failure reported by an application sprite callback.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CallbackError {
    /// The callback addressed an attribute the layout does not have.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// Application-defined failure.
    #[error("{0}")]
    Message(String),
}

impl CallbackError {
    /// Builds a [`CallbackError::Message`].
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}

/// Failure reported by a [`GraphicsBackend`](crate::backend::GraphicsBackend).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("graphics backend error: {0}")]
pub struct BackendError(pub String);

/// Why a hit-test handle was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HitTestError {
    /// The request was cancelled before it resolved.
    #[error("hit test was cancelled")]
    Cancelled,

    /// The backend failed to run the hit-test pass.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// One of the coordinator's batch operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Promoting waiting sprites into recycled swatches.
    AssignWaiting,
    /// Running pending enter/update/exit callbacks.
    RunCallbacks,
    /// Capturing in-flight interpolation state.
    Rebase,
    /// Flashing target values to the backend.
    TextureSync,
    /// Watching to-be-removed sprites for elapsed arrivals.
    Removal,
    /// Issuing a draw call.
    Draw,
    /// Resolving a hit test.
    HitTest,
}

impl BatchKind {
    /// Every batch, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::AssignWaiting,
        Self::RunCallbacks,
        Self::Rebase,
        Self::TextureSync,
        Self::Removal,
        Self::Draw,
        Self::HitTest,
    ];

    /// Number of batch kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of `self` in [`ALL`](Self::ALL).
    #[must_use]
    pub const fn slot(self) -> usize {
        self as usize
    }
}

/// Top-level error type.
#[derive(thiserror::Error, Debug)]
pub enum SwatchError {
    /// Invalid construction-time settings.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Illegal phase transition or invalid API use.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Scheduler misuse.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Backend failure outside of hit testing.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A batch ran with a non-empty range containing no eligible sprite.
    #[error("invariant violation in {batch:?}: {detail}")]
    InvariantViolation {
        /// The batch that noticed the problem.
        batch: BatchKind,
        /// Human-readable description.
        detail: String,
    },

    /// An application callback failed. The sprite's own bookkeeping was
    /// completed before this error was returned.
    #[error("callback for sprite at swatch {index} failed")]
    Callback {
        /// Swatch index of the sprite whose callback failed.
        index: usize,
        /// The callback's error.
        #[source]
        source: CallbackError,
    },
}

impl SwatchError {
    /// Builds a [`SwatchError::InvariantViolation`].
    pub fn invariant(batch: BatchKind, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            batch,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = SwatchError::from(ConfigurationError::DuplicateComponent("SizeX".into()));
        assert!(err.to_string().contains("SizeX"), "got: {err}");

        let err = SwatchError::from(LifecycleError::IllegalTransition {
            from: LifecyclePhase::Rest,
            to: LifecyclePhase::Removed,
        });
        assert!(err.to_string().contains("Rest -> Removed"), "got: {err}");

        let err = SwatchError::invariant(BatchKind::Rebase, "no sprite in NeedsRebase");
        assert!(err.to_string().contains("Rebase"), "got: {err}");
    }

    #[test]
    fn batch_slots_follow_declaration_order() {
        for (i, kind) in BatchKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.slot(), i, "{kind:?} out of place");
        }
        assert_eq!(
            BatchKind::HitTest.slot() + 1,
            BatchKind::COUNT,
            "ALL lists every kind"
        );
    }

    #[test]
    fn callback_error_wraps_attribute_error() {
        let err: CallbackError = AttributeError::UnknownComponent("Nope".into()).into();
        assert_eq!(err.to_string(), "unknown attribute component `Nope`");
        assert_eq!(
            CallbackError::message("boom").to_string(),
            "boom",
            "message is displayed verbatim"
        );
    }
}
