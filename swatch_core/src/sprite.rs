// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Application-facing sprite handles.
//!
//! A [`Sprite`] is a cheap, clonable handle. The state it points to is
//! shared with the [`Coordinator`](crate::coordinator::Coordinator) that
//! created it; the coordinator decides when callbacks run and when the
//! swatch is recycled.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;
use core::fmt;

use crate::error::{CallbackError, LifecycleError};
use crate::lifecycle::LifecyclePhase;
use crate::view::SpriteView;

pub(crate) type SpriteCallback =
    Box<dyn FnOnce(&mut SpriteView<'_>) -> Result<(), CallbackError>>;

/// What the coordinator has to be told when a sprite changes.
pub(crate) trait SpriteHost {
    /// A sprite at `index` moved from `Rest` to `HasCallback`.
    fn request_callbacks(&self, index: usize);
}

/// Per-sprite bookkeeping shared between handle and coordinator.
pub(crate) struct SpriteRecord {
    pub(crate) index: Option<usize>,
    pub(crate) phase: LifecyclePhase,
    enter: Option<SpriteCallback>,
    update: Option<SpriteCallback>,
    exit: Option<SpriteCallback>,
    pub(crate) to_be_removed: bool,
    pub(crate) abandoned: bool,
    /// Elapsed milliseconds at which the latest transition completes.
    pub(crate) arrival_ms: f32,
    /// The target swatch has been cleared for removal and no callback has
    /// written to it since.
    pub(crate) zeroed: bool,
}

impl SpriteRecord {
    pub(crate) fn new() -> Self {
        Self {
            index: None,
            phase: LifecyclePhase::Created,
            enter: None,
            update: None,
            exit: None,
            to_be_removed: false,
            abandoned: false,
            arrival_ms: 0.0,
            zeroed: false,
        }
    }

    pub(crate) fn has_callback(&self) -> bool {
        self.enter.is_some() || self.update.is_some() || self.exit.is_some()
    }

    /// Takes the highest-priority pending callback: enter, then update, then
    /// exit.
    pub(crate) fn take_next_callback(&mut self) -> Option<SpriteCallback> {
        self.enter
            .take()
            .or_else(|| self.update.take())
            .or_else(|| self.exit.take())
    }
}

#[derive(Clone, Copy)]
enum CallbackKind {
    Enter,
    Update,
    Exit,
}

/// Handle to a sprite owned by a coordinator.
///
/// Two handles are equal when they refer to the same sprite.
#[derive(Clone)]
pub struct Sprite {
    record: Rc<RefCell<SpriteRecord>>,
    host: Weak<dyn SpriteHost>,
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.borrow();
        f.debug_struct("Sprite")
            .field("index", &record.index)
            .field("phase", &record.phase)
            .field("to_be_removed", &record.to_be_removed)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Sprite {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }
}

impl Eq for Sprite {}

impl Sprite {
    pub(crate) fn new(record: Rc<RefCell<SpriteRecord>>, host: Weak<dyn SpriteHost>) -> Self {
        Self { record, host }
    }

    pub(crate) fn record(&self) -> &Rc<RefCell<SpriteRecord>> {
        &self.record
    }

    /// Registers the callback that initializes the sprite's attributes.
    ///
    /// Replaces a previously registered, not yet run enter callback.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::SpriteRemoved`] once the sprite is removed, or
    /// [`LifecycleError::Detached`] if its coordinator is gone.
    pub fn enter<F>(&self, callback: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut SpriteView<'_>) -> Result<(), CallbackError> + 'static,
    {
        self.register(CallbackKind::Enter, Box::new(callback))
    }

    /// Registers a callback that changes the sprite's attributes.
    ///
    /// # Errors
    ///
    /// See [`enter`](Self::enter).
    pub fn update<F>(&self, callback: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut SpriteView<'_>) -> Result<(), CallbackError> + 'static,
    {
        self.register(CallbackKind::Update, Box::new(callback))
    }

    /// Registers the final callback and marks the sprite for removal once
    /// that callback's transition has elapsed.
    ///
    /// # Errors
    ///
    /// See [`enter`](Self::enter).
    pub fn exit<F>(&self, callback: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut SpriteView<'_>) -> Result<(), CallbackError> + 'static,
    {
        self.register(CallbackKind::Exit, Box::new(callback))
    }

    /// Gives up on a sprite that is still waiting for a swatch.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AlreadyAbandoned`] on a second call and
    /// [`LifecycleError::AlreadyAssigned`] once the sprite owns a swatch.
    pub fn abandon(&self) -> Result<(), LifecycleError> {
        let mut record = self.record.borrow_mut();
        if record.abandoned {
            return Err(LifecycleError::AlreadyAbandoned);
        }
        if record.index.is_some() {
            return Err(LifecycleError::AlreadyAssigned);
        }
        record.phase.transition_to(LifecyclePhase::Removed)?;
        record.abandoned = true;
        record.enter = None;
        record.update = None;
        record.exit = None;
        Ok(())
    }

    /// The swatch this sprite occupies, once assigned.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.record.borrow().index
    }

    /// The current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.record.borrow().phase
    }

    /// Whether the sprite is queued for a swatch.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        let record = self.record.borrow();
        record.phase == LifecyclePhase::Created && !record.abandoned
    }

    /// Whether [`abandon`](Self::abandon) succeeded.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.record.borrow().abandoned
    }

    /// Whether the sprite reached its terminal phase.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.record.borrow().phase == LifecyclePhase::Removed
    }

    /// Whether an exit callback has been registered.
    #[must_use]
    pub fn is_to_be_removed(&self) -> bool {
        self.record.borrow().to_be_removed
    }

    /// Whether any callback is still pending.
    #[must_use]
    pub fn has_pending_callbacks(&self) -> bool {
        self.record.borrow().has_callback()
    }

    fn register(&self, kind: CallbackKind, callback: SpriteCallback) -> Result<(), LifecycleError> {
        let mut record = self.record.borrow_mut();
        if record.phase == LifecyclePhase::Removed {
            return Err(LifecycleError::SpriteRemoved);
        }
        match kind {
            CallbackKind::Enter => record.enter = Some(callback),
            CallbackKind::Update => record.update = Some(callback),
            CallbackKind::Exit => {
                record.exit = Some(callback);
                record.to_be_removed = true;
            }
        }
        let Some(index) = record.index else {
            // Still waiting; callbacks are picked up on assignment.
            return Ok(());
        };
        if record.phase != LifecyclePhase::Rest {
            // Already in flight; TextureSync routes it back to HasCallback.
            return Ok(());
        }
        let host = self.host.upgrade().ok_or(LifecycleError::Detached)?;
        record.phase.transition_to(LifecyclePhase::HasCallback)?;
        drop(record);
        host.request_callbacks(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::attributes::{AttributeMapper, MapperSettings};

    #[derive(Default)]
    struct RecordingHost {
        requests: RefCell<Vec<usize>>,
    }

    impl SpriteHost for RecordingHost {
        fn request_callbacks(&self, index: usize) {
            self.requests.borrow_mut().push(index);
        }
    }

    fn sprite(host: &Rc<RecordingHost>) -> Sprite {
        let host: Rc<dyn SpriteHost> = host.clone();
        Sprite::new(
            Rc::new(RefCell::new(SpriteRecord::new())),
            Rc::downgrade(&host),
        )
    }

    fn assign(sprite: &Sprite, index: usize) {
        let mut record = sprite.record().borrow_mut();
        record.index = Some(index);
        record.phase = LifecyclePhase::Rest;
    }

    #[test]
    fn callbacks_on_waiting_sprite_are_held() {
        let host = Rc::new(RecordingHost::default());
        let sprite = sprite(&host);
        sprite.enter(|_| Ok(())).unwrap();
        assert!(sprite.is_waiting(), "never assigned");
        assert!(sprite.has_pending_callbacks(), "enter is held");
        assert!(host.requests.borrow().is_empty(), "nothing to schedule yet");
    }

    #[test]
    fn callback_on_resting_sprite_requests_work() {
        let host = Rc::new(RecordingHost::default());
        let sprite = sprite(&host);
        assign(&sprite, 3);
        sprite.update(|_| Ok(())).unwrap();
        assert_eq!(sprite.phase(), LifecyclePhase::HasCallback);
        sprite.update(|_| Ok(())).unwrap();
        assert_eq!(*host.requests.borrow(), [3], "requested once");
    }

    #[test]
    fn priority_is_enter_update_exit() {
        let host = Rc::new(RecordingHost::default());
        let sprite = sprite(&host);
        let order = Rc::new(RefCell::new(Vec::new()));
        for (name, f) in [("exit", 2), ("update", 1), ("enter", 0)] {
            let order = order.clone();
            let cb = move |_: &mut SpriteView<'_>| {
                order.borrow_mut().push(name);
                Ok(())
            };
            match f {
                0 => sprite.enter(cb).unwrap(),
                1 => sprite.update(cb).unwrap(),
                _ => sprite.exit(cb).unwrap(),
            }
        }
        assert!(sprite.is_to_be_removed(), "exit marks removal");
        let mut record = sprite.record().borrow_mut();
        let mut callbacks = Vec::new();
        while let Some(cb) = record.take_next_callback() {
            callbacks.push(cb);
        }
        assert_eq!(callbacks.len(), 3, "one of each kind");
        drop(record);
        let mapper = AttributeMapper::new(&MapperSettings::with_capacity(1)).unwrap();
        let mut values = alloc::vec![0.0; mapper.values_per_swatch()];
        for cb in callbacks {
            cb(&mut SpriteView::new(&mapper, &mut values)).unwrap();
        }
        assert_eq!(*order.borrow(), ["enter", "update", "exit"]);
    }

    #[test]
    fn abandon_rules() {
        let host = Rc::new(RecordingHost::default());
        let waiting = sprite(&host);
        assert_eq!(waiting.abandon(), Ok(()));
        assert!(waiting.is_removed(), "abandoned sprites are terminal");
        assert_eq!(waiting.abandon(), Err(LifecycleError::AlreadyAbandoned));
        assert_eq!(
            waiting.enter(|_| Ok(())),
            Err(LifecycleError::SpriteRemoved),
            "no callbacks after removal"
        );

        let assigned = sprite(&host);
        assign(&assigned, 0);
        assert_eq!(assigned.abandon(), Err(LifecycleError::AlreadyAssigned));
    }

    #[test]
    fn detached_host_is_reported() {
        let host = Rc::new(RecordingHost::default());
        let sprite = sprite(&host);
        assign(&sprite, 0);
        drop(host);
        assert_eq!(sprite.update(|_| Ok(())), Err(LifecycleError::Detached));
        assert_eq!(sprite.phase(), LifecyclePhase::Rest, "phase untouched");
    }

    #[test]
    fn equality_is_identity() {
        let host = Rc::new(RecordingHost::default());
        let a = sprite(&host);
        let b = sprite(&host);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
