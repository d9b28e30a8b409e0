//! Tunables of the experience, loaded from `experience.json`.
//!
//! Every section defaults on its own, so a config file only needs to name
//! what it changes.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ExperienceError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    pub camera: CameraConfig,
    pub chest: ChestConfig,
    pub trapdoor: TrapdoorConfig,
    pub physics: PhysicsConfig,
    pub music: MusicConfig,
    pub world: WorldConfig,
}

impl ExperienceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExperienceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ExperienceError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| ExperienceError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One leg of the opening cut-scene: where the camera travels and how long
/// it takes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutSceneLeg {
    pub position: Vec3,
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Where the camera rests and where cut-scene cancellation snaps to.
    pub resting_position: Vec3,
    /// Orbit pivot.
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub cut_scene: Vec<CutSceneLeg>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 35.0,
            near: 0.1,
            far: 100.0,
            resting_position: Vec3::new(0.0, 3.0, 5.0),
            target: Vec3::ZERO,
            min_distance: 5.0,
            max_distance: 15.0,
            min_polar_angle: 0.0,
            max_polar_angle: 1.2,
            min_azimuth_angle: -75f32.to_radians(),
            max_azimuth_angle: 75f32.to_radians(),
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            cut_scene: vec![
                CutSceneLeg {
                    position: Vec3::new(4.0, 4.0, 6.0),
                    duration: 2.0,
                },
                CutSceneLeg {
                    position: Vec3::new(-4.0, 2.0, 5.0),
                    duration: 2.0,
                },
                CutSceneLeg {
                    position: Vec3::new(0.0, 1.5, 3.0),
                    duration: 2.5,
                },
                CutSceneLeg {
                    position: Vec3::new(0.0, 3.0, 5.0),
                    duration: 1.5,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChestConfig {
    /// Height the chest is dropped from, and where a swapped-out body respawns.
    pub drop_height: f32,
    pub mass: f32,
    pub half_extents: Vec3,
    /// Added to every mesh position when building overlay anchors.
    pub anchor_offset: Vec3,
    pub shake_clip: String,
    pub fall_clip: String,
    pub success_clip: String,
    pub failure_clip: String,
}

impl Default for ChestConfig {
    fn default() -> Self {
        Self {
            drop_height: 4.0,
            mass: 3.0,
            half_extents: Vec3::new(1.0, 0.0, 1.0),
            anchor_offset: Vec3::new(0.0, 0.5, 0.0),
            shake_clip: "shake".to_string(),
            fall_clip: "fall".to_string(),
            success_clip: "success".to_string(),
            failure_clip: "failure".to_string(),
        }
    }
}

impl ChestConfig {
    pub fn drop_position(&self) -> Vec3 {
        Vec3::new(0.0, self.drop_height, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapdoorConfig {
    pub model: String,
    /// Sub-mesh whose world position anchors the floor body.
    pub floor_node: String,
    pub open_clip: String,
    pub position: Vec3,
}

impl Default for TrapdoorConfig {
    fn default() -> Self {
        Self {
            model: "trapdoor".to_string(),
            floor_node: "floor".to_string(),
            open_clip: "open".to_string(),
            position: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Contact speed above which an impact sound plays.
    pub impact_threshold: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.82, 0.0),
            impact_threshold: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub ambient_track: String,
    pub cut_scene_track: String,
    pub impact_sound: String,
    pub volume: f32,
    pub fade_seconds: f32,
    /// Impact speed that plays the impact sound at full volume.
    pub impact_full_volume_speed: f32,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            ambient_track: "ambient".to_string(),
            cut_scene_track: "cutScene".to_string(),
            impact_sound: "impact".to_string(),
            volume: 0.5,
            fade_seconds: 1.0,
            impact_full_volume_speed: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub default_chest: String,
    /// Seconds to wait for a selection before loading `default_chest`.
    pub fallback_seconds: f32,
    pub environment_map: Option<String>,
    pub environment_intensity: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            default_chest: "chest".to_string(),
            fallback_seconds: 3.0,
            environment_map: Some("environmentMap".to_string()),
            environment_intensity: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ExperienceConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ExperienceConfig::default());
        assert_eq!(config.camera.cut_scene.len(), 4);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ExperienceConfig::from_json_str(
            r#"{ "chest": { "drop_height": 1.0 }, "world": { "default_chest": "gold" } }"#,
        )
        .unwrap();
        assert_eq!(config.world.default_chest, "gold");
        assert_eq!(config.chest.drop_height, 1.0);
        assert_eq!(config.chest.mass, 3.0);
    }

    #[test]
    fn cut_scene_lasts_about_eight_seconds() {
        let total: f32 = CameraConfig::default()
            .cut_scene
            .iter()
            .map(|leg| leg.duration)
            .sum();
        assert_eq!(total, 8.0);
    }

    #[test]
    fn vectors_are_plain_arrays() {
        let config = ExperienceConfig::from_json_str(
            r#"{ "camera": { "resting_position": [1.0, 2.0, 3.0] } }"#,
        )
        .unwrap();
        assert_eq!(config.camera.resting_position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn missing_file_is_a_config_io_error() {
        let err = ExperienceConfig::from_path("does/not/exist.json").unwrap_err();
        assert!(matches!(err, ExperienceError::ConfigIo { .. }));
    }
}
