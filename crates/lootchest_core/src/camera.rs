use glam::{Mat4, UVec2, Vec2, Vec3, Vec4Swizzles};

/// Perspective projection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 35.0f32.to_radians(),
            aspect_ratio: 16.0 / 9.0, // Standard monitor
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new(fov_degrees: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            fov: fov_degrees.to_radians(),
            aspect_ratio,
            near,
            far,
        }
    }

    /// Computes the "Projection Matrix" (View -> Clip)
    pub fn compute_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }
}

/// Copy of the camera state handed to overlay consumers each frame, enough to
/// project world points into the canvas without touching the live camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSnapshot {
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub viewport: UVec2,
}

impl CameraSnapshot {
    /// Projects a world-space point to pixel coordinates (origin top-left).
    /// Points behind the camera have no screen position.
    pub fn project(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.view_proj * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        let size = self.viewport.as_vec2();
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * size.x,
            (-ndc.y * 0.5 + 0.5) * size.y,
        ))
    }
}
