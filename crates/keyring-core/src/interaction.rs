//! Pointer gestures: taps fire effects, swipes push nearby segments.

use std::collections::BTreeMap;
use std::sync::Arc;

use rapier2d::prelude::Vector;

use crate::assembly::Assembly;
use crate::config::InteractionTuning;
use crate::error::AssemblyId;
use crate::joint::distance;
use crate::physics::PhysicsWorld;
use crate::segment::SegmentRole;

/// Host hooks for sound and particle playback.
pub trait EffectSink: Send + Sync {
    fn on_tap_effect(&self, effect_id: &str);
    fn on_swipe_effect(&self, effect_id: &str, position: [f32; 2]);
}

/// Mutable world plus the assemblies living in it.
pub struct LiveScene<'a> {
    world: &'a mut PhysicsWorld,
    assemblies: &'a BTreeMap<AssemblyId, Assembly>,
}

impl<'a> LiveScene<'a> {
    pub fn new(world: &'a mut PhysicsWorld, assemblies: &'a BTreeMap<AssemblyId, Assembly>) -> Self {
        Self { world, assemblies }
    }

    /// Live assemblies, topmost layer first.
    fn live(&self) -> impl Iterator<Item = &'a Assembly> + use<'a> {
        self.assemblies.values().rev().filter(|a| a.is_live())
    }
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Nothing was hit and nothing moved.
    Idle,
    Tap { assembly: AssemblyId },
    /// Number of segments pushed by the release impulse (zero when the
    /// gesture had already been handled as a swipe while moving).
    Swipe { impulses: usize },
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    start: [f32; 2],
    last: [f32; 2],
    last_t: f32,
    promoted: bool,
}

/// Turns pointer events into taps and swipe impulses.
pub struct InteractionController<S> {
    tuning: InteractionTuning,
    sink: Arc<S>,
    gesture: Option<Gesture>,
    last_particle_t: Option<f32>,
}

impl<S: EffectSink> InteractionController<S> {
    pub fn new(tuning: InteractionTuning, sink: Arc<S>) -> Self {
        Self {
            tuning,
            sink,
            gesture: None,
            last_particle_t: None,
        }
    }

    pub fn is_swiping(&self) -> bool {
        self.gesture.is_some_and(|g| g.promoted)
    }

    pub fn on_pointer_down(&mut self, position: [f32; 2], t: f32) {
        self.gesture = Some(Gesture {
            start: position,
            last: position,
            last_t: t,
            promoted: false,
        });
    }

    /// Returns the number of segments pushed by this move.
    pub fn on_pointer_move(&mut self, scene: &mut LiveScene<'_>, position: [f32; 2], t: f32) -> usize {
        let Some(mut gesture) = self.gesture else {
            return 0;
        };

        let velocity = self.velocity(&gesture, position, t);
        if !gesture.promoted && distance(gesture.start, position) >= self.tuning.tap_distance {
            gesture.promoted = true;
            tracing::debug!("[interaction] Gesture promoted to swipe");
        }

        let pushed = if gesture.promoted {
            self.maybe_emit_particles(position, velocity, t);
            self.apply_impulses(scene, position, velocity)
        } else {
            0
        };

        gesture.last = position;
        gesture.last_t = t;
        self.gesture = Some(gesture);
        pushed
    }

    pub fn on_pointer_up(&mut self, scene: &mut LiveScene<'_>, position: [f32; 2], t: f32) -> PointerOutcome {
        let Some(gesture) = self.gesture.take() else {
            return PointerOutcome::Idle;
        };
        if gesture.promoted {
            return PointerOutcome::Swipe { impulses: 0 };
        }

        if distance(gesture.start, position) >= self.tuning.tap_distance {
            let velocity = self.velocity(&gesture, position, t);
            self.maybe_emit_particles(position, velocity, t);
            let impulses = self.apply_impulses(scene, position, velocity);
            return PointerOutcome::Swipe { impulses };
        }

        let hit = scene
            .live()
            .find(|assembly| assembly.body_contains(scene.world, position));
        match hit {
            Some(assembly) => {
                let effect = assembly
                    .spec
                    .tap_effect
                    .as_deref()
                    .unwrap_or(&self.tuning.tap_effect);
                tracing::debug!("[interaction] Tap on assembly {}", assembly.id);
                self.sink.on_tap_effect(effect);
                PointerOutcome::Tap {
                    assembly: assembly.id,
                }
            }
            None => PointerOutcome::Idle,
        }
    }

    fn velocity(&self, gesture: &Gesture, position: [f32; 2], t: f32) -> [f32; 2] {
        let dt = (t - gesture.last_t).max(self.tuning.min_dt);
        [
            (position[0] - gesture.last[0]) / dt,
            (position[1] - gesture.last[1]) / dt,
        ]
    }

    fn maybe_emit_particles(&mut self, position: [f32; 2], velocity: [f32; 2], t: f32) {
        let speed = velocity[0].hypot(velocity[1]);
        if speed <= self.tuning.particle_speed {
            return;
        }
        let cooled = self
            .last_particle_t
            .is_none_or(|last| t - last >= self.tuning.particle_cooldown);
        if cooled {
            self.last_particle_t = Some(t);
            self.sink.on_swipe_effect(&self.tuning.swipe_effect, position);
        }
    }

    /// Pushes every dynamic link and body within the proximity radius, scaled
    /// by mass, role and distance falloff.
    fn apply_impulses(&self, scene: &mut LiveScene<'_>, position: [f32; 2], velocity: [f32; 2]) -> usize {
        let radius = self.tuning.proximity_radius;
        let mut pushed = 0;

        for assembly in scene.live() {
            for (segment, handle) in assembly.segments.iter().zip(&assembly.body_handles) {
                let role_factor = match segment.role {
                    SegmentRole::Ring => continue,
                    SegmentRole::ChainLink { .. } => self.tuning.link_factor,
                    SegmentRole::Body => self.tuning.body_factor,
                };
                let Some(body) = scene.world.get_rigid_body_mut(*handle) else {
                    continue;
                };
                if !body.is_dynamic() {
                    continue;
                }
                let t = body.translation();
                let d = distance([t.x, t.y], position);
                if d >= radius {
                    continue;
                }

                let scale = body.mass() * self.tuning.base_factor * role_factor * (1.0 - d / radius);
                body.apply_impulse(Vector::new(velocity[0] * scale, velocity[1] * scale), true);
                pushed += 1;
            }
        }

        if pushed > 0 {
            tracing::debug!("[interaction] Swipe pushed {pushed} segments");
        }
        pushed
    }
}
