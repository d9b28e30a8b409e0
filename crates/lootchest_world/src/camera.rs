//! Perspective camera with orbit controls.
//!
//! The camera has exactly one driver at a time. While [`CameraDrive::Interactive`]
//! the orbit controls move it from pointer input; while
//! [`CameraDrive::Scripted`] the controls are off and only
//! [`CameraRig::apply_scripted_pose`] and [`CameraRig::snap_to`] write the
//! transform.

use std::f32::consts::PI;

use glam::{Mat4, UVec2, Vec3};
use lootchest_core::{
    Sizes,
    camera::{Camera, CameraSnapshot},
    transform::Transform,
};

use crate::config::CameraConfig;

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLE_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraDrive {
    Interactive,
    Scripted,
}

/// Radius, polar angle from +Y and azimuth around +Y measured from +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

/// Orbit controls limited to an angular and distance envelope, with damped
/// rotation and no panning.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            target: config.target,
            enabled: true,
            enable_damping: true,
            damping_factor: config.damping_factor,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar_angle: config.min_polar_angle,
            max_polar_angle: config.max_polar_angle,
            min_azimuth_angle: config.min_azimuth_angle,
            max_azimuth_angle: config.max_azimuth_angle,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            disposed: false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Pending rotation still to be applied by damping.
    pub fn has_momentum(&self) -> bool {
        self.delta_theta.abs() > 1e-6 || self.delta_phi.abs() > 1e-6
    }

    fn accepts_input(&self) -> bool {
        self.enabled && !self.disposed
    }

    fn clear_motion(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
    }

    /// Applies pending motion to `transform`, clamped to the envelope.
    fn apply(&mut self, transform: &mut Transform) {
        let mut spherical = Spherical::from_offset(transform.translation - self.target);

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.delta_theta * step;
        spherical.phi += self.delta_phi * step;

        spherical.theta = spherical
            .theta
            .clamp(self.min_azimuth_angle, self.max_azimuth_angle);
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        transform.translation = self.target + spherical.to_offset();
        transform.look_at(self.target, Vec3::Y);

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;
    }
}

pub struct CameraRig {
    camera: Camera,
    transform: Transform,
    controls: OrbitControls,
    drive: CameraDrive,
    viewport: UVec2,
}

impl CameraRig {
    pub fn new(config: &CameraConfig, sizes: &Sizes) -> Self {
        let camera = Camera::new(config.fov_degrees, sizes.aspect(), config.near, config.far);
        let controls = OrbitControls::new(config);
        let transform =
            Transform::from_translation(config.resting_position).looking_at(controls.target, Vec3::Y);

        Self {
            camera,
            transform,
            controls,
            drive: CameraDrive::Interactive,
            viewport: UVec2::new(sizes.width, sizes.height),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn drive(&self) -> CameraDrive {
        self.drive
    }

    /// Hands the camera to one driver. Going scripted disables the controls
    /// and drops their pending motion; going interactive re-enables them from
    /// wherever the camera now is.
    pub fn set_drive(&mut self, drive: CameraDrive) {
        if self.drive == drive {
            return;
        }
        self.drive = drive;
        self.controls.clear_motion();
        self.controls.enabled = drive == CameraDrive::Interactive;
        log::debug!("camera drive is now {drive:?}");
    }

    /// Recomputes aspect ratio and projection for the new canvas size.
    pub fn resize(&mut self, sizes: &Sizes) {
        self.camera.aspect_ratio = sizes.aspect();
        self.viewport = UVec2::new(sizes.width, sizes.height);
    }

    /// Per-frame control update: applies damped rotation and zoom. Does
    /// nothing while scripted.
    pub fn update(&mut self) {
        if self.drive != CameraDrive::Interactive || !self.controls.accepts_input() {
            return;
        }
        self.controls.apply(&mut self.transform);
    }

    /// Pointer drag in pixels. Ignored unless the controls are live.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if self.drive != CameraDrive::Interactive || !self.controls.accepts_input() {
            return;
        }
        let height = self.viewport.y.max(1) as f32;
        self.controls.delta_theta -= 2.0 * PI * dx / height * self.controls.rotate_speed;
        self.controls.delta_phi -= 2.0 * PI * dy / height * self.controls.rotate_speed;
    }

    /// Wheel steps; positive moves closer.
    pub fn zoom(&mut self, steps: f32) {
        if self.drive != CameraDrive::Interactive || !self.controls.accepts_input() {
            return;
        }
        self.controls.scale *= 0.95f32.powf(steps * self.controls.zoom_speed);
    }

    /// Writes a tweened pose. Only the scripted driver may do this.
    pub fn apply_scripted_pose(&mut self, position: Vec3, look_at: Vec3) -> bool {
        if self.drive != CameraDrive::Scripted {
            return false;
        }
        self.transform.translation = position;
        self.transform.look_at(look_at, Vec3::Y);
        true
    }

    /// Puts the camera at `position` looking at `look_at`, whoever drives it,
    /// and drops any pending orbit motion.
    pub fn snap_to(&mut self, position: Vec3, look_at: Vec3) {
        self.transform.translation = position;
        self.transform.look_at(look_at, Vec3::Y);
        self.controls.clear_motion();
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.transform.compute_matrix().inverse()
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            view_proj: self.camera.compute_projection_matrix() * self.view_matrix(),
            eye: self.transform.translation,
            viewport: self.viewport,
        }
    }

    /// Detaches the controls for good.
    pub fn dispose(&mut self) {
        self.controls.enabled = false;
        self.controls.disposed = true;
        self.controls.clear_motion();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> CameraRig {
        CameraRig::new(&CameraConfig::default(), &Sizes::new(800, 600, 1.0))
    }

    #[test]
    fn starts_at_resting_pose_looking_at_target() {
        let rig = rig();
        assert_eq!(rig.position(), Vec3::new(0.0, 3.0, 5.0));
        let expected = (-rig.position()).normalize();
        assert!(rig.transform().forward().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn update_without_input_keeps_the_camera_still() {
        let mut rig = rig();
        rig.update();
        assert!(rig.position().abs_diff_eq(Vec3::new(0.0, 3.0, 5.0), 1e-4));
    }

    #[test]
    fn zoom_is_clamped_to_distance_limits() {
        let mut rig = rig();
        for _ in 0..200 {
            rig.zoom(-5.0);
            rig.update();
        }
        assert!((rig.position().length() - 15.0).abs() < 1e-3);

        for _ in 0..200 {
            rig.zoom(5.0);
            rig.update();
        }
        assert!((rig.position().length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_never_exceeds_limit() {
        let mut rig = rig();
        for _ in 0..300 {
            rig.rotate(0.0, -400.0);
            rig.update();
        }
        let offset = rig.position();
        let polar = (offset.y / offset.length()).acos();
        assert!(polar <= 1.2 + 1e-4, "polar = {polar}");
    }

    #[test]
    fn azimuth_is_limited_to_75_degrees() {
        let mut rig = rig();
        for _ in 0..300 {
            rig.rotate(-400.0, 0.0);
            rig.update();
        }
        let p = rig.position();
        let azimuth = p.x.atan2(p.z);
        assert!(azimuth.abs() <= 75f32.to_radians() + 1e-4, "azimuth = {azimuth}");
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let mut rig = rig();
        rig.rotate(50.0, 0.0);
        rig.update();
        let first = rig.position();
        assert!(rig.controls().has_momentum());
        rig.update();
        assert_ne!(rig.position(), first);
    }

    #[test]
    fn scripted_drive_ignores_user_input() {
        let mut rig = rig();
        rig.set_drive(CameraDrive::Scripted);
        assert!(!rig.controls().enabled);

        rig.rotate(300.0, 300.0);
        rig.zoom(10.0);
        rig.update();
        assert_eq!(rig.position(), Vec3::new(0.0, 3.0, 5.0));
    }

    #[test]
    fn scripted_pose_needs_scripted_drive() {
        let mut rig = rig();
        assert!(!rig.apply_scripted_pose(Vec3::ONE, Vec3::ZERO));
        rig.set_drive(CameraDrive::Scripted);
        assert!(rig.apply_scripted_pose(Vec3::new(4.0, 4.0, 6.0), Vec3::ZERO));
        assert_eq!(rig.position(), Vec3::new(4.0, 4.0, 6.0));
    }

    #[test]
    fn resize_updates_aspect_and_viewport() {
        let mut rig = rig();
        rig.resize(&Sizes::new(1000, 500, 1.0));
        assert_eq!(rig.camera().aspect_ratio, 2.0);
        assert_eq!(rig.snapshot().viewport, UVec2::new(1000, 500));
    }

    #[test]
    fn target_projects_to_screen_center() {
        let rig = rig();
        let screen = rig.snapshot().project(Vec3::ZERO).unwrap();
        assert!((screen.x - 400.0).abs() < 1e-2);
        assert!((screen.y - 300.0).abs() < 1e-2);
    }

    #[test]
    fn disposed_controls_stay_off() {
        let mut rig = rig();
        rig.dispose();
        rig.set_drive(CameraDrive::Scripted);
        rig.set_drive(CameraDrive::Interactive);
        rig.rotate(100.0, 0.0);
        rig.update();
        assert_eq!(rig.position(), Vec3::new(0.0, 3.0, 5.0));
    }
}
