use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::PhysicsWorld;

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub(crate) fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn to_quat(iso: &Isometry<Real>) -> Quat {
    let q = iso.rotation.quaternion().coords;
    Quat::from_xyzw(q.x, q.y, q.z, q.w)
}

impl PhysicsWorld {
    pub(crate) fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| to_vec3(b.translation()))
    }

    pub(crate) fn body_rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|b| to_quat(b.position()))
    }
}
