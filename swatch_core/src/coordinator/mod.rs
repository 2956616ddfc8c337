// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The sprite arena and its batch operations.
//!
//! A [`Coordinator`] owns a fixed-capacity array of swatches, a FIFO of
//! sprites waiting for one, and a handful of [`NumericRange`]s recording
//! which swatches might need which treatment. It never does work inside the
//! sprite API calls beyond bookkeeping; everything else happens in batch
//! tasks run by the shared [`WorkScheduler`]:
//!
//! ```text
//!   Sprite::update ─► callbacks ─► RunCallbacks ─┬─► rebase ─► Rebase ─┐
//!                                                └──────────────────────┴─► sync ─► TextureSync
//!                                                                                      │
//!          AssignWaiting ◄─ removed ◄─────────────────────────────────────────────────┤
//!                              Removal ◄─ removal (exit still in flight) ◄────────────┘
//! ```
//!
//! Target values are written into a CPU-side buffer by callbacks and flashed
//! to the backend one whole texture row at a time by TextureSync. Before
//! rows holding a mid-transition sprite are flashed, Rebase asks the backend
//! to capture where that sprite currently is, so the new transition starts
//! from there.

mod hit_test;
mod tasks;

pub use hit_test::{HitTestHandle, HitTestResult};

use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::attributes::{AttributeMapper, MapperSettings};
use crate::backend::{GraphicsBackend, HitTestParameters};
use crate::error::{BatchKind, SwatchResult};
use crate::lifecycle::LifecyclePhase;
use crate::range::NumericRange;
use crate::scheduler::{TaskId, TaskOptions, WorkScheduler};
use crate::sprite::{Sprite, SpriteHost, SpriteRecord};
use crate::time::HostTime;
use crate::timing::TimingSource;
use crate::trace::Tracer;

use self::hit_test::HitTestState;
use self::tasks::BatchTask;

/// Coordinator tuning.
#[derive(Clone, Debug)]
pub struct CoordinatorSettings {
    /// Swatch layout.
    pub mapper: MapperSettings,
    /// Transition duration used when a callback does not set one.
    pub default_transition_ms: f32,
    /// Sprites a batch handles between two budget checks.
    pub step_check_interval: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            mapper: MapperSettings::default(),
            default_transition_ms: 250.0,
            step_check_interval: 500,
        }
    }
}

impl CoordinatorSettings {
    /// Default settings with an explicit swatch capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            mapper: MapperSettings::with_capacity(capacity),
            ..Self::default()
        }
    }
}

/// CPU-side arena state.
pub(crate) struct ArenaState {
    pub(crate) sprites: Vec<Option<Rc<RefCell<SpriteRecord>>>>,
    pub(crate) waiting: VecDeque<Rc<RefCell<SpriteRecord>>>,
    /// Target values for every swatch, laid out like the texture.
    pub(crate) target: Vec<f32>,
    pub(crate) instance_count: usize,
    next_fresh: usize,
    pub(crate) callbacks: NumericRange,
    pub(crate) rebase: NumericRange,
    pub(crate) sync: NumericRange,
    pub(crate) removal: NumericRange,
    pub(crate) removal_ts: NumericRange<f32>,
    pub(crate) removed: NumericRange,
    pub(crate) latest_arrival_ms: f32,
}

impl ArenaState {
    fn new(mapper: &AttributeMapper) -> Self {
        let capacity = mapper.total_swatches();
        Self {
            sprites: vec![None; capacity],
            waiting: VecDeque::new(),
            target: vec![0.0; capacity * mapper.values_per_swatch()],
            instance_count: 0,
            next_fresh: 0,
            callbacks: NumericRange::new(),
            rebase: NumericRange::new(),
            sync: NumericRange::new(),
            removal: NumericRange::new(),
            removal_ts: NumericRange::new(),
            removed: NumericRange::new(),
            latest_arrival_ms: 0.0,
        }
    }

    pub(crate) fn record(&self, index: usize) -> Option<&Rc<RefCell<SpriteRecord>>> {
        self.sprites.get(index).and_then(Option::as_ref)
    }

    /// Drops abandoned sprites from the front of the waiting queue.
    pub(crate) fn prune_waiting(&mut self) {
        while self
            .waiting
            .front()
            .is_some_and(|r| r.borrow().phase != LifecyclePhase::Created)
        {
            self.waiting.pop_front();
        }
    }

    /// Lowest recycled index, or the next never-used one.
    pub(crate) fn take_free_index(&mut self) -> Option<usize> {
        if let Some((low, high)) = self.removed.bounds() {
            for index in low..=high {
                let recyclable = self
                    .record(index)
                    .is_some_and(|r| r.borrow().phase == LifecyclePhase::Removed);
                if recyclable {
                    self.removed.truncate_to_within(index + 1, high);
                    return Some(index);
                }
            }
            self.removed.clear();
        }
        if self.next_fresh < self.sprites.len() {
            let index = self.next_fresh;
            self.next_fresh += 1;
            return Some(index);
        }
        None
    }

    pub(crate) fn swatch_mut(&mut self, index: usize, values_per_swatch: usize) -> &mut [f32] {
        let start = index * values_per_swatch;
        &mut self.target[start..start + values_per_swatch]
    }
}

/// State shared between the coordinator, its tasks, and sprite handles.
pub(crate) struct Shared<B> {
    pub(crate) mapper: AttributeMapper,
    pub(crate) scheduler: Rc<WorkScheduler>,
    pub(crate) arena: RefCell<ArenaState>,
    pub(crate) backend: RefCell<B>,
    pub(crate) hit_test: RefCell<Option<Rc<RefCell<HitTestState>>>>,
    task_ids: [TaskId; BatchKind::COUNT],
    epoch: HostTime,
    pub(crate) default_transition_ms: f32,
    pub(crate) step_check_interval: usize,
    this: Weak<Self>,
}

impl<B: GraphicsBackend + 'static> Shared<B> {
    pub(crate) fn timing(&self) -> &dyn TimingSource {
        &**self.scheduler.timing()
    }

    /// Milliseconds since the coordinator was created.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "sprite timestamps are f32 texture values"
    )]
    pub(crate) fn now_ms(&self) -> f32 {
        let timing = self.timing();
        timing.now().millis_since(self.epoch, timing.timebase()) as f32
    }

    pub(crate) fn host(&self) -> Weak<dyn SpriteHost> {
        self.this.clone()
    }

    pub(crate) fn sprite(&self, record: &Rc<RefCell<SpriteRecord>>) -> Sprite {
        Sprite::new(record.clone(), self.host())
    }

    pub(crate) fn task_id(&self, kind: BatchKind) -> TaskId {
        self.task_ids[kind.slot()]
    }

    pub(crate) fn schedule(&self, kind: BatchKind) {
        self.scheduler
            .schedule_task(self.task_id(kind), task_options(kind), self.batch_task(kind));
    }

    /// Replaces any queued instance of `kind` with one that runs in the
    /// current cycle.
    pub(crate) fn schedule_now(&self, kind: BatchKind) {
        self.scheduler.schedule_unique_task(
            self.task_id(kind),
            task_options(kind).begin_immediately(),
            self.batch_task(kind),
        );
    }

    fn batch_task(&self, kind: BatchKind) -> BatchTask<B> {
        BatchTask {
            shared: self.this.clone(),
            kind,
        }
    }

    pub(crate) fn with_tracer(&self, f: impl FnOnce(&mut Tracer)) {
        self.scheduler.with_tracer(f);
    }

    /// Binds `record` to swatch `index`.
    pub(crate) fn assign(
        &self,
        arena: &mut ArenaState,
        index: usize,
        record: Rc<RefCell<SpriteRecord>>,
    ) -> SwatchResult<()> {
        arena
            .swatch_mut(index, self.mapper.values_per_swatch())
            .fill(0.0);
        let needs_callbacks = {
            let mut r = record.borrow_mut();
            r.phase.transition_to(LifecyclePhase::Rest)?;
            r.index = Some(index);
            if r.has_callback() {
                r.phase.transition_to(LifecyclePhase::HasCallback)?;
                true
            } else {
                false
            }
        };
        arena.sprites[index] = Some(record);
        arena.instance_count = arena.instance_count.max(index + 1);
        tracing::trace!(index, "sprite assigned");
        if needs_callbacks {
            arena.callbacks.expand_to_include(index);
            self.schedule(BatchKind::RunCallbacks);
        }
        Ok(())
    }
}

impl<B: GraphicsBackend + 'static> SpriteHost for Shared<B> {
    fn request_callbacks(&self, index: usize) {
        self.arena.borrow_mut().callbacks.expand_to_include(index);
        self.schedule(BatchKind::RunCallbacks);
    }
}

const fn task_options(kind: BatchKind) -> TaskOptions {
    match kind {
        BatchKind::AssignWaiting
        | BatchKind::RunCallbacks
        | BatchKind::Rebase
        | BatchKind::TextureSync => TaskOptions::until_done(),
        BatchKind::Removal | BatchKind::HitTest => TaskOptions::one_shot(),
        BatchKind::Draw => TaskOptions::one_shot().animation_only(),
    }
}

/// Owner of a sprite arena backed by a [`GraphicsBackend`].
///
/// The coordinator schedules its batches on the [`WorkScheduler`] passed to
/// [`new`](Self::new); the host drives that scheduler's ticks.
pub struct Coordinator<B: GraphicsBackend + 'static> {
    shared: Rc<Shared<B>>,
}

impl<B: GraphicsBackend + 'static> fmt::Debug for Coordinator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.shared.arena.borrow();
        f.debug_struct("Coordinator")
            .field("capacity", &arena.sprites.len())
            .field("instance_count", &arena.instance_count)
            .field("waiting", &arena.waiting.len())
            .finish_non_exhaustive()
    }
}

impl<B: GraphicsBackend + 'static> Coordinator<B> {
    /// Lays out the arena and configures `backend` for it.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`](crate::error::ConfigurationError) for invalid
    /// mapper settings.
    #[tracing::instrument(skip_all)]
    pub fn new(
        settings: CoordinatorSettings,
        scheduler: Rc<WorkScheduler>,
        mut backend: B,
    ) -> SwatchResult<Self> {
        let mapper = AttributeMapper::new(&settings.mapper)?;
        backend.configure(&mapper);
        tracing::debug!(
            capacity = mapper.total_swatches(),
            width = mapper.texture_width(),
            height = mapper.texture_height(),
            "sprite arena configured"
        );
        let task_ids = core::array::from_fn(|_| scheduler.next_task_id());
        let epoch = scheduler.timing().now();
        let shared = Rc::new_cyclic(|this| Shared {
            arena: RefCell::new(ArenaState::new(&mapper)),
            mapper,
            scheduler,
            backend: RefCell::new(backend),
            hit_test: RefCell::new(None),
            task_ids,
            epoch,
            default_transition_ms: settings.default_transition_ms,
            step_check_interval: settings.step_check_interval.max(1),
            this: this.clone(),
        });
        Ok(Self { shared })
    }

    /// Creates a sprite, assigning it a swatch right away if one is free and
    /// no sprite is waiting ahead of it.
    ///
    /// # Errors
    ///
    /// Only on internal bookkeeping errors.
    pub fn create_sprite(&self) -> SwatchResult<Sprite> {
        let shared = &self.shared;
        let record = Rc::new(RefCell::new(SpriteRecord::new()));
        let sprite = shared.sprite(&record);
        let mut arena = shared.arena.borrow_mut();
        arena.prune_waiting();
        if arena.waiting.is_empty() {
            if let Some(index) = arena.take_free_index() {
                shared.assign(&mut arena, index, record)?;
                return Ok(sprite);
            }
        }
        tracing::trace!(waiting = arena.waiting.len() + 1, "arena full, sprite queued");
        arena.waiting.push_back(record);
        Ok(sprite)
    }

    /// Requests a hit test against the sprites' current bounds.
    ///
    /// While a request is pending, further requests replace its parameters
    /// and return the same handle.
    pub fn hit_test(&self, params: HitTestParameters) -> HitTestHandle {
        hit_test::request(&self.shared, params)
    }

    /// The swatch layout.
    #[must_use]
    pub fn mapper(&self) -> &AttributeMapper {
        &self.shared.mapper
    }

    /// The scheduler running this coordinator's batches.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<WorkScheduler> {
        &self.shared.scheduler
    }

    /// Number of swatches.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.mapper.total_swatches()
    }

    /// One past the highest index ever assigned.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.shared.arena.borrow().instance_count
    }

    /// Sprites waiting for a swatch, abandoned ones included until pruned.
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.shared.arena.borrow().waiting.len()
    }

    /// Milliseconds since the coordinator was created.
    #[must_use]
    pub fn elapsed_ms(&self) -> f32 {
        self.shared.now_ms()
    }

    /// CPU-side target values of swatch `index`.
    #[must_use]
    pub fn target_values(&self, index: usize) -> Option<Vec<f32>> {
        let vps = self.shared.mapper.values_per_swatch();
        let arena = self.shared.arena.borrow();
        arena
            .target
            .get(index * vps..(index + 1) * vps)
            .map(<[f32]>::to_vec)
    }

    /// Asks for a draw on the next frame tick.
    pub fn queue_draw(&self) {
        self.shared.schedule(BatchKind::Draw);
    }

    /// Runs `f` with the backend.
    pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(&self.shared.backend.borrow())
    }

    /// Runs `f` with the backend, mutably.
    ///
    /// Must not be called from inside a sprite callback.
    pub fn with_backend_mut<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.shared.backend.borrow_mut())
    }
}

impl<B: GraphicsBackend + 'static> Drop for Coordinator<B> {
    fn drop(&mut self) {
        for id in self.shared.task_ids {
            self.shared.scheduler.unschedule_task(id);
        }
    }
}
