use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};
use lootchest_core::FixedStep;
use rapier3d::prelude::*;

mod step;
mod sync;

pub use step::Impact;
use step::ImpactCollector;
use sync::to_vector;

/// Thinnest box accepted; flat boxes get this half-height instead.
pub const MIN_HALF_EXTENT: f32 = 0.01;

/// Rigid-body world holding at most one dynamic chest box and one static
/// floor.
pub struct PhysicsWorld {
    pub pipeline: PhysicsPipeline,
    pub gravity: Vector<Real>,
    pub integration_params: IntegrationParameters,
    pub islands: IslandManager,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,
    clock: FixedStep,
    box_body: Option<RigidBodyHandle>,
    floor_body: Option<RigidBodyHandle>,
    collector: ImpactCollector,
    impact_threshold: f32,
    impacts: Vec<Impact>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -9.82, 0.0), 1.5)
    }
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3, impact_threshold: f32) -> Self {
        let clock = FixedStep::default();
        let integration_params = IntegrationParameters {
            dt: clock.fixed_dt,
            ..IntegrationParameters::default()
        };

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: to_vector(gravity),
            integration_params,
            islands: IslandManager::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            clock,
            box_body: None,
            floor_body: None,
            collector: ImpactCollector::default(),
            impact_threshold,
            impacts: Vec::new(),
        }
    }

    /// Creates the dynamic box from half-extents. Does nothing if a box
    /// already exists; returns whether one was created.
    pub fn add_box(&mut self, hx: f32, hy: f32, hz: f32, mass: f32, position: Vec3) -> bool {
        if self.box_body.is_some() {
            return false;
        }

        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .build();
        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::cuboid(
            hx.max(MIN_HALF_EXTENT),
            hy.max(MIN_HALF_EXTENT),
            hz.max(MIN_HALF_EXTENT),
        )
        .mass(mass)
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        log::debug!("box body added at {position}");
        self.box_body = Some(handle);
        true
    }

    /// Creates the static floor plane, rotated to lie flat. Does nothing if a
    /// floor already exists; returns whether one was created.
    pub fn add_floor(&mut self, position: Vec3) -> bool {
        if self.floor_body.is_some() {
            return false;
        }

        let body = RigidBodyBuilder::fixed()
            .position(Isometry::new(
                to_vector(position),
                vector![-FRAC_PI_2, 0.0, 0.0],
            ))
            .build();
        let handle = self.bodies.insert(body);

        // Plane facing local +Z, which the rotation turns to world +Y.
        let collider = ColliderBuilder::halfspace(Vector::z_axis()).build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        log::debug!("floor body added at {position}");
        self.floor_body = Some(handle);
        true
    }

    pub fn remove_box(&mut self) -> bool {
        match self.box_body.take() {
            Some(handle) => {
                self.remove_body(handle);
                true
            }
            None => false,
        }
    }

    pub fn remove_floor(&mut self) -> bool {
        match self.floor_body.take() {
            Some(handle) => {
                self.remove_body(handle);
                true
            }
            None => false,
        }
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Teleports the box to `position`, upright and at rest.
    pub fn reset_box(&mut self, position: Vec3) -> bool {
        let Some(body) = self.box_body.and_then(|h| self.bodies.get_mut(h)) else {
            return false;
        };
        body.set_position(Isometry::translation(position.x, position.y, position.z), true);
        body.set_linvel(Vector::zeros(), true);
        body.set_angvel(Vector::zeros(), true);
        true
    }

    pub fn set_floor_position(&mut self, position: Vec3) -> bool {
        let Some(body) = self.floor_body.and_then(|h| self.bodies.get_mut(h)) else {
            return false;
        };
        body.set_translation(to_vector(position), true);
        true
    }

    pub fn has_box(&self) -> bool {
        self.box_body.is_some()
    }

    pub fn has_floor(&self) -> bool {
        self.floor_body.is_some()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn dynamic_body_count(&self) -> usize {
        self.bodies.iter().filter(|(_, b)| b.is_dynamic()).count()
    }

    pub fn box_position(&self) -> Option<Vec3> {
        self.body_translation(self.box_body?)
    }

    pub fn box_rotation(&self) -> Option<Quat> {
        self.body_rotation(self.box_body?)
    }

    pub fn floor_position(&self) -> Option<Vec3> {
        self.body_translation(self.floor_body?)
    }

    /// Impacts recorded since the last call, oldest first.
    pub fn drain_impacts(&mut self) -> Vec<Impact> {
        std::mem::take(&mut self.impacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_box_is_idempotent() {
        let mut physics = PhysicsWorld::default();
        assert!(physics.add_box(1.0, 0.0, 1.0, 3.0, Vec3::new(0.0, 5.0, 0.0)));
        assert!(!physics.add_box(2.0, 2.0, 2.0, 9.0, Vec3::new(4.0, 4.0, 4.0)));

        assert_eq!(physics.dynamic_body_count(), 1);
        assert_eq!(physics.box_position(), Some(Vec3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn add_floor_is_idempotent() {
        let mut physics = PhysicsWorld::default();
        assert!(physics.add_floor(Vec3::ZERO));
        assert!(!physics.add_floor(Vec3::new(0.0, -3.0, 0.0)));

        assert_eq!(physics.body_count(), 1);
        assert_eq!(physics.floor_position(), Some(Vec3::ZERO));
    }

    #[test]
    fn zero_delta_does_not_move_bodies() {
        let mut physics = PhysicsWorld::default();
        physics.add_box(1.0, 0.0, 1.0, 3.0, Vec3::new(0.0, 5.0, 0.0));

        assert_eq!(physics.update(0.0), 0);
        assert_eq!(physics.box_position(), Some(Vec3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn box_falls_under_gravity() {
        let mut physics = PhysicsWorld::default();
        physics.add_box(1.0, 0.0, 1.0, 3.0, Vec3::new(0.0, 5.0, 0.0));

        for _ in 0..30 {
            physics.update(1.0 / 60.0);
        }
        let y = physics.box_position().unwrap().y;
        assert!(y < 5.0, "box did not fall: y = {y}");
    }

    #[test]
    fn box_lands_on_floor_and_reports_impact() {
        let mut physics = PhysicsWorld::default();
        physics.add_floor(Vec3::ZERO);
        physics.add_box(1.0, 0.0, 1.0, 3.0, Vec3::new(0.0, 3.0, 0.0));

        for _ in 0..240 {
            physics.update(1.0 / 60.0);
        }
        let y = physics.box_position().unwrap().y;
        assert!(y > -0.1 && y < 0.2, "box should rest on the floor, y = {y}");
        assert!(!physics.drain_impacts().is_empty());
        assert!(physics.drain_impacts().is_empty());
    }

    #[test]
    fn long_frames_are_capped() {
        let mut physics = PhysicsWorld::default();
        assert_eq!(physics.update(1.0), 3);
    }

    #[test]
    fn removed_box_can_be_recreated() {
        let mut physics = PhysicsWorld::default();
        physics.add_box(1.0, 0.0, 1.0, 3.0, Vec3::Y);
        assert!(physics.remove_box());
        assert!(!physics.remove_box());
        assert!(physics.box_position().is_none());

        assert!(physics.add_box(1.0, 0.0, 1.0, 3.0, Vec3::Y * 2.0));
        assert_eq!(physics.body_count(), 1);
    }

    #[test]
    fn reset_box_teleports_and_stops() {
        let mut physics = PhysicsWorld::default();
        physics.add_box(1.0, 0.0, 1.0, 3.0, Vec3::new(0.0, 5.0, 0.0));
        for _ in 0..20 {
            physics.update(1.0 / 60.0);
        }

        assert!(physics.reset_box(Vec3::new(0.0, 8.0, 0.0)));
        assert_eq!(physics.box_position(), Some(Vec3::new(0.0, 8.0, 0.0)));
        assert_eq!(physics.box_rotation(), Some(Quat::IDENTITY));
    }

    #[test]
    fn floor_follows_set_position() {
        let mut physics = PhysicsWorld::default();
        assert!(!physics.set_floor_position(Vec3::ONE));
        physics.add_floor(Vec3::ZERO);
        assert!(physics.set_floor_position(Vec3::new(0.0, -0.5, 0.0)));
        assert_eq!(physics.floor_position(), Some(Vec3::new(0.0, -0.5, 0.0)));
    }
}
