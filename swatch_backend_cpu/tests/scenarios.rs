// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end sprite lifecycles against the software backend.

use std::cell::RefCell;
use std::rc::Rc;

use swatch_backend_cpu::CpuBackend;
use swatch_core::backend::HitTestParameters;
use swatch_core::coordinator::{Coordinator, CoordinatorSettings};
use swatch_core::error::CallbackError;
use swatch_core::lifecycle::LifecyclePhase;
use swatch_core::scheduler::{SchedulerConfig, WorkScheduler};
use swatch_core::sprite::Sprite;
use swatch_core::timing::ManualTiming;
use swatch_core::view::SpriteView;
use swatch_debug::recorder::RecorderSink;

struct Harness {
    timing: Rc<ManualTiming>,
    coordinator: Coordinator<CpuBackend>,
}

impl Harness {
    fn new(capacity: usize) -> Self {
        let timing = Rc::new(ManualTiming::default());
        let scheduler = Rc::new(WorkScheduler::new(timing.clone(), SchedulerConfig::default()));
        let coordinator = Coordinator::new(
            CoordinatorSettings::with_capacity(capacity),
            scheduler,
            CpuBackend::new(),
        )
        .unwrap();
        Self {
            timing,
            coordinator,
        }
    }

    fn scheduler(&self) -> &WorkScheduler {
        self.coordinator.scheduler()
    }

    /// Runs work cycles until only self-rescheduling watchers could remain.
    fn run(&self) {
        for _ in 0..64 {
            if self.scheduler().queued_len() == 0 {
                return;
            }
            self.scheduler().perform_work().unwrap();
        }
    }

    fn advance(&self, millis: f64) {
        self.timing.advance_millis(millis);
    }

    fn create(&self, count: usize) -> Vec<Sprite> {
        (0..count)
            .map(|_| self.coordinator.create_sprite().unwrap())
            .collect()
    }

    /// Interpolated value of a channel as the backend would draw it now.
    fn drawn(&self, sprite: &Sprite, component: &str) -> f32 {
        let index = sprite.index().unwrap();
        let now = self.coordinator.elapsed_ms();
        self.coordinator
            .with_backend(|b| b.value_at(index, component, now))
            .unwrap()
    }

    fn velocity(&self, sprite: &Sprite, component: &str) -> f32 {
        let index = sprite.index().unwrap();
        let now = self.coordinator.elapsed_ms();
        self.coordinator
            .with_backend(|b| b.velocity_at(index, component, now))
            .unwrap()
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn move_to(
    x: f32,
    millis: f32,
) -> impl FnOnce(&mut SpriteView<'_>) -> Result<(), CallbackError> + 'static {
    move |view| {
        view.set_transition_time_ms(millis)?;
        view.set("PositionWorldX", x)?;
        Ok(())
    }
}

#[test]
fn waiting_sprite_takes_recycled_swatch() {
    let h = Harness::new(4);
    let sprites = h.create(5);
    assert!(sprites[4].is_waiting(), "arena holds four");
    assert_eq!(h.coordinator.waiting_len(), 1);

    sprites[4]
        .enter(|view| {
            view.set_transition_time_ms(0.0)?;
            view.set("Sides", 3.0)?;
            Ok(())
        })
        .unwrap();
    sprites[2]
        .exit(|view| {
            view.set_transition_time_ms(100.0)?;
            view.set("PositionWorldX", 77.0)?;
            Ok(())
        })
        .unwrap();
    h.run();
    assert_eq!(sprites[2].phase(), LifecyclePhase::Rest, "exit still animating");
    assert!(sprites[4].is_waiting(), "nothing freed yet");

    h.advance(100.0);
    h.run();
    assert!(sprites[2].is_removed());
    assert_eq!(sprites[4].index(), Some(2), "promoted into the recycled swatch");
    assert_eq!(sprites[4].phase(), LifecyclePhase::Rest);
    assert_eq!(h.coordinator.waiting_len(), 0);
    assert_eq!(h.drawn(&sprites[4], "Sides"), 3.0);
    assert_eq!(
        h.drawn(&sprites[4], "PositionWorldX"),
        0.0,
        "nothing left over from the previous occupant"
    );
}

#[test]
fn overlapping_update_blends_from_drawn_position() {
    let h = Harness::new(4);
    let sprite = h.create(1).remove(0);
    sprite.update(move_to(100.0, 1000.0)).unwrap();
    h.scheduler().perform_work().unwrap();
    assert_eq!(sprite.phase(), LifecyclePhase::NeedsRebase);
    h.run();
    assert_eq!(sprite.phase(), LifecyclePhase::Rest);

    h.advance(500.0);
    let x = h.drawn(&sprite, "PositionWorldX");
    let v = h.velocity(&sprite, "PositionWorldX");
    assert!(close(x, 50.0), "halfway, got {x}");
    assert!(close(v, 0.15), "still moving, got {v}");

    sprite.update(move_to(200.0, 1000.0)).unwrap();
    h.run();
    let x = h.drawn(&sprite, "PositionWorldX");
    let v = h.velocity(&sprite, "PositionWorldX");
    assert!(close(x, 50.0), "no jump back to the stale start, got {x}");
    assert!(close(v, 0.15), "velocity carried over, got {v}");

    h.advance(1000.0);
    assert_eq!(h.drawn(&sprite, "PositionWorldX"), 200.0);
}

#[test]
fn exit_recycles_a_zeroed_swatch() {
    let h = Harness::new(2);
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    h.scheduler().set_trace_sink(Box::new(recorder.clone()));

    let sprite = h.create(1).remove(0);
    sprite.enter(move_to(5.0, 0.0)).unwrap();
    h.run();
    sprite.exit(move_to(10.0, 200.0)).unwrap();
    h.run();
    assert!(sprite.is_to_be_removed());
    assert_eq!(sprite.phase(), LifecyclePhase::Rest);

    h.advance(100.0);
    h.run();
    assert!(!sprite.is_removed(), "exit transition not over");
    assert!(close(h.drawn(&sprite, "PositionWorldX"), 7.5), "halfway out");

    h.advance(100.0);
    h.run();
    assert!(sprite.is_removed());
    assert_eq!(recorder.borrow().removed_indices(), [0]);
    h.coordinator.with_backend(|b| {
        assert!(
            b.target_swatch(0).unwrap().iter().all(|v| *v == 0.0),
            "zeros flashed to the texture"
        );
    });

    let next = h.create(1).remove(0);
    assert_eq!(next.index(), Some(0), "recycled before fresh");
    assert!(
        h.coordinator.target_values(0).unwrap().iter().all(|v| *v == 0.0),
        "new sprite starts from a clean swatch"
    );
}

#[test]
fn row_shared_with_a_rebase_is_not_flashed_early() {
    let h = Harness::new(4);
    let sprites = h.create(2);
    let (a, b) = (sprites[0].clone(), sprites[1].clone());
    b.update(move_to(100.0, 1000.0)).unwrap();
    h.run();
    h.advance(500.0);

    let nested = b.clone();
    a.update(move |view| {
        view.set_transition_time_ms(0.0)?;
        nested
            .update(move_to(0.0, 1000.0))
            .map_err(|e| CallbackError::message(e.to_string()))?;
        Ok(())
    })
    .unwrap();
    h.run();

    assert_eq!(a.phase(), LifecyclePhase::Rest);
    assert_eq!(b.phase(), LifecyclePhase::Rest);
    let x = h.drawn(&b, "PositionWorldX");
    assert!(close(x, 50.0), "rebased before its row was uploaded, got {x}");
    h.advance(1000.0);
    assert_eq!(h.drawn(&b, "PositionWorldX"), 0.0);
}

#[test]
fn hit_test_follows_the_drawn_position() {
    let h = Harness::new(4);
    let sprites = h.create(2);
    for (sprite, y) in sprites.iter().zip([0.0, 50.0]) {
        sprite
            .enter(move |view| {
                view.set_transition_time_ms(0.0)?;
                view.set_position_world(0.0, y)?;
                view.set_size_world(10.0, 10.0)?;
                Ok(())
            })
            .unwrap();
    }
    h.run();
    sprites[0].update(move_to(100.0, 1000.0)).unwrap();
    h.run();
    h.advance(500.0);

    let near_middle = h
        .coordinator
        .hit_test(HitTestParameters::new(48.0, -2.0, 4.0, 4.0, true));
    h.run();
    let result = near_middle.poll().unwrap().unwrap();
    assert_eq!(result.hits, [sprites[0].clone()], "caught mid-flight");

    let at_target = h
        .coordinator
        .hit_test(HitTestParameters::new(98.0, -2.0, 4.0, 4.0, true));
    h.run();
    assert!(at_target.poll().unwrap().unwrap().hits.is_empty(), "not there yet");

    let edge = h
        .coordinator
        .hit_test(HitTestParameters::new(-10.0, 55.0, 5.0, 5.0, false));
    h.run();
    assert!(
        edge.poll().unwrap().unwrap().hits.is_empty(),
        "corner contact is not an exclusive hit"
    );
}

#[test]
fn draws_wait_for_frame_ticks() {
    let h = Harness::new(4);
    let sprite = h.create(1).remove(0);
    sprite.update(move_to(10.0, 100.0)).unwrap();
    assert!(h.timing.pending_frame().is_some(), "frame requested for new work");

    for _ in 0..8 {
        if h.timing.fire_timeout() {
            h.scheduler().on_timeout_tick().unwrap();
        }
    }
    assert_eq!(sprite.phase(), LifecyclePhase::Rest, "timeouts do the batch work");
    let stats = h.coordinator.with_backend(CpuBackend::stats);
    assert_eq!(stats.draws, 0, "drawing is frame-only");
    assert_eq!(stats.uploads, 1);

    assert!(h.timing.fire_frame());
    h.scheduler().on_frame_tick().unwrap();
    assert_eq!(h.coordinator.with_backend(CpuBackend::stats).draws, 1);
    assert!(h.timing.pending_frame().is_some(), "animation keeps drawing");

    h.advance(100.0);
    assert!(h.timing.fire_frame());
    h.scheduler().on_frame_tick().unwrap();
    let stats = h.coordinator.with_backend(CpuBackend::stats);
    assert_eq!(stats.draws, 2);
    assert_eq!(stats.last_draw, Some((1, 100.0)));
    assert_eq!(h.scheduler().queued_len(), 0, "settled");
    assert_eq!(h.timing.pending_frame(), None, "timers released");
}
