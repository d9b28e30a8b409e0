use std::sync::Arc;

use glam::Vec3;
use lootchest_assets::{CubeTextureData, TextureData, TextureFormat};

/// Pixels sampled per face when averaging a cube map.
const SAMPLES_PER_FACE: usize = 256;

/// Average linear colour of a cube map, used as the flat ambient term.
pub fn average_color(cube: &CubeTextureData) -> Vec3 {
    let sum: Vec3 = cube.faces.iter().map(average_face).sum();
    sum / cube.faces.len() as f32
}

fn average_face(face: &TextureData) -> Vec3 {
    let pixel_count = face.pixels.len() / 4;
    if pixel_count == 0 {
        return Vec3::ZERO;
    }

    let stride = (pixel_count / SAMPLES_PER_FACE).max(1);
    let mut sum = Vec3::ZERO;
    let mut taken = 0;
    for pixel in face.pixels.chunks_exact(4).step_by(stride) {
        let rgb = Vec3::new(pixel[0] as f32, pixel[1] as f32, pixel[2] as f32) / 255.0;
        sum += match face.format {
            TextureFormat::Rgba8UnormSrgb => srgb_to_linear(rgb),
            TextureFormat::Rgba8Unorm => rgb,
        };
        taken += 1;
    }
    sum / taken as f32
}

fn srgb_to_linear(c: Vec3) -> Vec3 {
    c.powf(2.2)
}

/// Remembers the average of the last cube map it saw so the pixels are only
/// walked again when the scene swaps maps.
#[derive(Default)]
pub struct CubeColorCache {
    source: Option<Arc<CubeTextureData>>,
    color: Vec3,
}

impl CubeColorCache {
    pub fn resolve(&mut self, cube: Option<&Arc<CubeTextureData>>) -> Option<Vec3> {
        let cube = match cube {
            Some(cube) => cube,
            None => {
                self.source = None;
                return None;
            }
        };

        let stale = self
            .source
            .as_ref()
            .is_none_or(|cached| !Arc::ptr_eq(cached, cube));
        if stale {
            self.color = average_color(cube);
            self.source = Some(Arc::clone(cube));
        }
        Some(self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(rgba: [u8; 4], format: TextureFormat) -> CubeTextureData {
        let face = |i: usize| TextureData {
            name: format!("face{i}"),
            pixels: rgba.repeat(4),
            width: 2,
            height: 2,
            format,
        };
        CubeTextureData {
            faces: [face(0), face(1), face(2), face(3), face(4), face(5)],
        }
    }

    #[test]
    fn white_cube_averages_to_one() {
        let color = average_color(&cube([255, 255, 255, 255], TextureFormat::Rgba8UnormSrgb));
        assert!(color.abs_diff_eq(Vec3::ONE, 1e-5));
    }

    #[test]
    fn srgb_faces_are_linearised() {
        let unorm = average_color(&cube([128, 128, 128, 255], TextureFormat::Rgba8Unorm));
        let srgb = average_color(&cube([128, 128, 128, 255], TextureFormat::Rgba8UnormSrgb));
        assert!(srgb.x < unorm.x);
    }

    #[test]
    fn cache_recomputes_only_for_new_maps() {
        let red = Arc::new(cube([255, 0, 0, 255], TextureFormat::Rgba8Unorm));
        let blue = Arc::new(cube([0, 0, 255, 255], TextureFormat::Rgba8Unorm));
        let mut cache = CubeColorCache::default();

        assert_eq!(cache.resolve(Some(&red)), Some(Vec3::X));
        assert_eq!(cache.resolve(Some(&red)), Some(Vec3::X));
        assert_eq!(cache.resolve(Some(&blue)), Some(Vec3::Z));
        assert_eq!(cache.resolve(None), None);
    }
}
