use std::sync::Mutex;

use rapier3d::prelude::*;

use crate::PhysicsWorld;

/// The box hit something while moving faster than the impact threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    /// Box speed just before the contact started.
    pub velocity: f32,
}

#[derive(Default)]
pub(crate) struct ImpactCollector {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl ImpactCollector {
    fn drain(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        let mut started = self
            .started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *started)
    }
}

impl EventHandler for ImpactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(a, b, _) = event {
            self.started
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((a, b));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

impl PhysicsWorld {
    /// Advances the simulation by `dt` seconds of real time in fixed slices.
    /// Returns the number of slices run; a zero `dt` runs none.
    pub fn update(&mut self, dt: f32) -> u32 {
        let steps = self.clock.substeps(dt);
        for _ in 0..steps {
            self.step();
        }
        steps
    }

    fn step(&mut self) {
        let speed_before = self
            .box_body
            .and_then(|h| self.bodies.get(h))
            .map(|b| b.linvel().norm())
            .unwrap_or(0.0);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.collector,
        );

        for (a, b) in self.collector.drain() {
            let touches_box = [a, b].iter().any(|&c| {
                self.colliders.get(c).and_then(|c| c.parent()) == self.box_body
                    && self.box_body.is_some()
            });
            if touches_box && speed_before > self.impact_threshold {
                log::trace!("box impact at {speed_before:.2} m/s");
                self.impacts.push(Impact {
                    velocity: speed_before,
                });
            }
        }
    }
}
