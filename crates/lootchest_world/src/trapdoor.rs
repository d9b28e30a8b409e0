use flecs_ecs::prelude::Entity;
use glam::Vec3;
use lootchest_assets::Resources;
use lootchest_core::transform::Transform;
use lootchest_physics::PhysicsWorld;
use lootchest_scene::{ActionId, AnimationMixer, Disposable, LoopMode, ReleasedResources, Scene};

use crate::{config::TrapdoorConfig, error::ExperienceError};

/// The hatch the chest falls through. Built once when resources are ready;
/// its floor node carries the static floor body.
pub struct Trapdoor {
    root: Entity,
    floor: Entity,
    mixer: AnimationMixer,
    open: Option<ActionId>,
}

impl Trapdoor {
    pub fn new(
        config: &TrapdoorConfig,
        resources: &Resources,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
    ) -> Result<Self, ExperienceError> {
        let model = resources
            .model(&config.model)
            .ok_or_else(|| ExperienceError::MissingModel(config.model.clone()))?;

        let root = scene.spawn_model(&model, "trapdoor", None);
        scene.set_transform(root, Transform::from_translation(config.position));
        scene.set_shadows(root, true, true);
        scene.update_world_matrices();

        let floor = match scene.find_by_name(root, &config.floor_node) {
            Some(floor) => floor,
            None => {
                log::warn!(
                    "trapdoor has no '{}' node; floor anchored to the model root",
                    config.floor_node
                );
                root
            }
        };
        let floor_position = scene.world_position(floor).unwrap_or(config.position);
        physics.add_floor(floor_position);

        let mut mixer = AnimationMixer::new();
        let open = model
            .animation(&config.open_clip)
            .map(|clip| mixer.clip_action(clip, root, scene));
        if open.is_none() {
            log::warn!("trapdoor model has no '{}' clip", config.open_clip);
        }

        log::info!("trapdoor ready, floor at {floor_position}");
        Ok(Self {
            root,
            floor,
            mixer,
            open,
        })
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn floor_node(&self) -> Entity {
        self.floor
    }

    /// Plays the open clip once and holds the last frame.
    pub fn open_trapdoor(&mut self) -> bool {
        let Some(open) = self.open else {
            log::warn!("cannot open trapdoor: no open clip");
            return false;
        };
        self.mixer.reset(open);
        self.mixer.set_loop(open, LoopMode::Once);
        if let Some(action) = self.mixer.action_mut(open) {
            action.clamp_when_finished = true;
        }
        self.mixer.play(open)
    }

    /// Back to frame zero, closed.
    pub fn close_trapdoor(&mut self, scene: &mut Scene) -> bool {
        match self.open {
            Some(open) => self.mixer.stop(open, scene),
            None => false,
        }
    }

    pub fn is_opening(&self) -> bool {
        self.open.is_some_and(|open| self.mixer.is_running(open))
    }

    /// Advances the clip and drags the floor body along with the floor node.
    pub fn update(&mut self, dt: f32, scene: &mut Scene, physics: &mut PhysicsWorld) {
        self.mixer.update(dt, scene);
        scene.update_world_matrices();
        if let Some(position) = scene.world_position(self.floor) {
            physics.set_floor_position(position);
        }
    }

    pub fn floor_position(&self, scene: &Scene) -> Option<Vec3> {
        scene.world_position(self.floor)
    }
}

impl Disposable for Trapdoor {
    fn dispose(&mut self, scene: &mut Scene) -> ReleasedResources {
        self.mixer.uncache_root(self.root);
        self.open = None;
        scene.despawn_recursive(self.root)
    }
}
