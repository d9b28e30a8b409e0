//! The chest on display and its animation state machine.
//!
//! ```text
//! Unloaded -> Idle(shake) -> Opening(fall) -> AwaitingResult
//!          -> SuccessHighlight | FailureHighlight -> Idle(shake)
//! ```
//!
//! The opening cut-scene runs beside that machine; it only owns the camera.

use std::sync::Arc;

use flecs_ecs::prelude::Entity;
use glam::Vec3;
use lootchest_assets::{ModelData, Resources};
use lootchest_core::{ChestPoints, EventBus, OutboundEvent, transform::Transform};
use lootchest_physics::PhysicsWorld;
use lootchest_scene::{
    ActionId, AnimationMixer, Disposable, LoopMode, MixerEvent, ReleasedResources, Scene,
    Timeline, TimelineEvent, TweenLeg,
};
use tokio::sync::oneshot;

use crate::{
    camera::{CameraDrive, CameraRig},
    config::{CameraConfig, ChestConfig, CutSceneLeg},
    error::ChestError,
    music::Music,
};

/// Completion hook for cut-scenes and reveals. Runs at most once.
pub type Callback = Box<dyn FnOnce()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChestState {
    Unloaded,
    Idle,
    Opening,
    AwaitingResult,
    SuccessHighlight,
    FailureHighlight,
}

/// Which highlight to play once the outcome of an opening is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Highlight {
    Success,
    Failure,
}

/// Clip actions bound for the current chest. A model may lack any of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimationSet {
    pub shake: Option<ActionId>,
    pub fall: Option<ActionId>,
    pub success: Option<ActionId>,
    pub failure: Option<ActionId>,
}

impl AnimationSet {
    pub fn highlight(&self, highlight: Highlight) -> Option<ActionId> {
        match highlight {
            Highlight::Success => self.success,
            Highlight::Failure => self.failure,
        }
    }
}

struct BoundChest {
    name: String,
    root: Entity,
}

struct CutScene {
    timeline: Timeline,
    on_complete: Option<Callback>,
}

pub struct LootChest {
    config: ChestConfig,
    resting_position: Vec3,
    cut_scene_legs: Vec<CutSceneLeg>,
    bound: Option<BoundChest>,
    mixer: AnimationMixer,
    animations: AnimationSet,
    state: ChestState,
    active_highlight: Option<Highlight>,
    highlight_waiters: Vec<(ActionId, oneshot::Sender<()>)>,
    /// Anchor positions relative to the chest root.
    anchor_offsets: Vec<Vec3>,
    cut_scene: Option<CutScene>,
}

impl LootChest {
    pub fn new(config: &ChestConfig, camera: &CameraConfig) -> Self {
        Self {
            config: config.clone(),
            resting_position: camera.resting_position,
            cut_scene_legs: camera.cut_scene.clone(),
            bound: None,
            mixer: AnimationMixer::new(),
            animations: AnimationSet::default(),
            state: ChestState::Unloaded,
            active_highlight: None,
            highlight_waiters: Vec::new(),
            anchor_offsets: Vec::new(),
            cut_scene: None,
        }
    }

    pub fn state(&self) -> ChestState {
        self.state
    }

    pub fn animations(&self) -> &AnimationSet {
        &self.animations
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn is_loaded(&self) -> bool {
        self.bound.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.name.as_str())
    }

    pub fn root(&self) -> Option<Entity> {
        self.bound.as_ref().map(|b| b.root)
    }

    pub fn active_highlight(&self) -> Option<Highlight> {
        self.active_highlight
    }

    pub fn is_cut_scene_active(&self) -> bool {
        self.cut_scene.is_some()
    }

    /// World position of the chest, or of the drop point while none is bound.
    pub fn position(&self, scene: &Scene) -> Vec3 {
        self.root()
            .and_then(|root| scene.world_position(root))
            .unwrap_or_else(|| self.config.drop_position())
    }

    pub fn anchor_count(&self) -> usize {
        self.anchor_offsets.len()
    }

    pub fn anchor_points(&self, scene: &Scene) -> Vec<Vec3> {
        let origin = self.position(scene);
        self.anchor_offsets.iter().map(|&o| origin + o).collect()
    }

    /// Swaps in the model called `name`. The previous chest is despawned and
    /// its box body respawned at the drop point. An unknown name leaves the
    /// current chest alone.
    pub fn set_loot_chest(
        &mut self,
        name: &str,
        resources: &Resources,
        scene: &mut Scene,
        physics: &mut PhysicsWorld,
    ) -> Result<ReleasedResources, ChestError> {
        let model = resources
            .model(name)
            .ok_or_else(|| ChestError::UnknownModel(name.to_string()))?;

        let released = self.unbind(scene);

        let drop = self.config.drop_position();
        let root = scene.spawn_model(&model, name, None);
        scene.set_transform(root, Transform::from_translation(drop));
        scene.set_shadows(root, true, true);
        scene.update_world_matrices();

        let e = self.config.half_extents;
        if !physics.add_box(e.x, e.y, e.z, self.config.mass, drop) {
            physics.reset_box(drop);
        }

        self.animations = AnimationSet {
            shake: bind_clip(&mut self.mixer, &model, &self.config.shake_clip, root, scene),
            fall: bind_clip(&mut self.mixer, &model, &self.config.fall_clip, root, scene),
            success: bind_clip(&mut self.mixer, &model, &self.config.success_clip, root, scene),
            failure: bind_clip(&mut self.mixer, &model, &self.config.failure_clip, root, scene),
        };
        // Highlights only repeat while they are the active one.
        for id in [self.animations.success, self.animations.failure]
            .into_iter()
            .flatten()
        {
            self.mixer.set_loop(id, LoopMode::Once);
        }

        self.anchor_offsets = scene
            .meshes_under(root)
            .into_iter()
            .filter_map(|mesh| scene.world_position(mesh))
            .map(|p| p - drop + self.config.anchor_offset)
            .collect();

        self.bound = Some(BoundChest {
            name: name.to_string(),
            root,
        });
        self.state = ChestState::Idle;
        self.play_shake();

        log::info!(
            "chest '{name}' bound with {} anchors",
            self.anchor_offsets.len()
        );
        Ok(released)
    }

    fn play_shake(&mut self) {
        match self.animations.shake {
            Some(shake) => {
                self.mixer.reset(shake);
                self.mixer.play(shake);
            }
            None => log::warn!("chest has no '{}' clip", self.config.shake_clip),
        }
    }

    fn unbind(&mut self, scene: &mut Scene) -> ReleasedResources {
        self.highlight_waiters.clear();
        self.active_highlight = None;
        self.animations = AnimationSet::default();
        self.anchor_offsets.clear();
        self.state = ChestState::Unloaded;

        match self.bound.take() {
            Some(bound) => {
                log::debug!("unbinding chest '{}'", bound.name);
                self.mixer.uncache_root(bound.root);
                scene.despawn_recursive(bound.root)
            }
            None => ReleasedResources::default(),
        }
    }

    /// Stops, rewinds and pauses both highlights. Outstanding highlight
    /// signals are dropped.
    pub fn reset_animations(&mut self, scene: &mut Scene) {
        for id in [self.animations.success, self.animations.failure]
            .into_iter()
            .flatten()
        {
            self.mixer.stop(id, scene);
            self.mixer.set_paused(id, true);
        }
        self.highlight_waiters.clear();
        self.active_highlight = None;
        if matches!(
            self.state,
            ChestState::SuccessHighlight | ChestState::FailureHighlight
        ) {
            self.state = ChestState::Idle;
        }
    }

    /// Plays the drop-in clip. Without one the chest waits for a result
    /// straight away.
    pub fn start_opening(&mut self) -> bool {
        if self.bound.is_none() {
            return false;
        }
        match self.animations.fall {
            Some(fall) => {
                self.mixer.set_loop(fall, LoopMode::Once);
                if let Some(action) = self.mixer.action_mut(fall) {
                    action.clamp_when_finished = true;
                }
                self.mixer.reset(fall);
                self.mixer.play(fall);
                self.state = ChestState::Opening;
            }
            None => {
                log::warn!("chest has no '{}' clip", self.config.fall_clip);
                self.state = ChestState::AwaitingResult;
            }
        }
        true
    }

    /// Back to the shake loop on the drop point, as before any opening.
    pub fn reset_round(&mut self, scene: &mut Scene, physics: &mut PhysicsWorld) {
        if self.bound.is_none() {
            return;
        }
        self.reset_animations(scene);
        if let Some(fall) = self.animations.fall {
            self.mixer.stop(fall, scene);
        }
        physics.reset_box(self.config.drop_position());
        self.state = ChestState::Idle;
        self.play_shake();
    }

    pub fn start_success_animation(&mut self) -> Option<oneshot::Receiver<()>> {
        self.start_highlight(Highlight::Success)
    }

    pub fn start_failure_animation(&mut self) -> Option<oneshot::Receiver<()>> {
        self.start_highlight(Highlight::Failure)
    }

    /// Makes `highlight` the only highlight playing. The receiver resolves
    /// when the mixer reports the clip finished; `None` if the chest has no
    /// such clip.
    pub fn start_highlight(&mut self, highlight: Highlight) -> Option<oneshot::Receiver<()>> {
        let Some(action) = self.animations.highlight(highlight) else {
            log::warn!(
                "chest '{}' has no {highlight:?} clip",
                self.model_name().unwrap_or("<none>")
            );
            return None;
        };

        if self.active_highlight == Some(highlight) {
            self.mixer.set_loop(action, LoopMode::Once);
            self.mixer.reset(action);
            self.mixer.play(action);
        } else {
            // The outgoing highlight finishes its pass and holds.
            if let Some(previous) = self
                .active_highlight
                .and_then(|h| self.animations.highlight(h))
            {
                self.mixer.set_loop(previous, LoopMode::Once);
                if let Some(action) = self.mixer.action_mut(previous) {
                    action.clamp_when_finished = true;
                }
            }

            self.mixer.reset(action);
            self.mixer.set_loop(
                action,
                LoopMode::Repeat {
                    repetitions: Some(1),
                },
            );
            if let Some(action) = self.mixer.action_mut(action) {
                action.clamp_when_finished = true;
            }
            self.mixer.play(action);
            self.active_highlight = Some(highlight);
        }

        self.state = match highlight {
            Highlight::Success => ChestState::SuccessHighlight,
            Highlight::Failure => ChestState::FailureHighlight,
        };

        let (tx, rx) = oneshot::channel();
        self.highlight_waiters.push((action, tx));
        Some(rx)
    }

    /// Hands the camera to a tween through the configured legs, each tick
    /// aimed at the chest. Natural completion gives the camera back and runs
    /// `callback`.
    pub fn start_opening_cut_scene(
        &mut self,
        camera: &mut CameraRig,
        music: &mut Music,
        events: &EventBus<OutboundEvent>,
        callback: Callback,
    ) {
        if let Some(mut previous) = self.cut_scene.take() {
            previous.timeline.kill();
        }

        camera.set_drive(CameraDrive::Scripted);
        events.publish(OutboundEvent::HideUi);
        music.play_cut_scene();

        let legs = self
            .cut_scene_legs
            .iter()
            .map(|leg| TweenLeg::new(leg.position, leg.duration))
            .collect();
        let timeline = Timeline::new(camera.position(), legs);
        log::debug!("cut-scene started, {:.1}s", timeline.total_duration());

        self.cut_scene = Some(CutScene {
            timeline,
            on_complete: Some(callback),
        });
    }

    /// Skips the cut-scene: every pending leg is dropped, the camera snaps to
    /// its resting pose facing the chest and `callback` runs before this
    /// returns. The callback given to the start call is never invoked.
    pub fn end_opening_cut_scene(
        &mut self,
        scene: &Scene,
        camera: &mut CameraRig,
        music: &mut Music,
        events: &EventBus<OutboundEvent>,
        callback: Callback,
    ) {
        if let Some(mut cut_scene) = self.cut_scene.take() {
            cut_scene.timeline.kill();
        }

        camera.snap_to(self.resting_position, self.position(scene));
        camera.set_drive(CameraDrive::Interactive);
        music.play_ambient();
        events.publish(OutboundEvent::ShowUi);
        callback();
    }

    pub fn update(
        &mut self,
        dt: f32,
        scene: &mut Scene,
        physics: &PhysicsWorld,
        camera: &mut CameraRig,
        music: &mut Music,
        events: &EventBus<OutboundEvent>,
    ) {
        if let (Some(root), Some(position)) = (self.root(), physics.box_position()) {
            scene.with_transform(root, |t| t.translation = position);
        }

        for event in self.mixer.update(dt, scene) {
            if let MixerEvent::Finished(id) = event {
                self.on_action_finished(id);
            }
        }
        scene.update_world_matrices();

        self.update_cut_scene(dt, scene, camera, music, events);

        if !self.anchor_offsets.is_empty() {
            events.publish(OutboundEvent::ChestPointsUpdated(ChestPoints {
                points: self.anchor_points(scene),
                camera: camera.snapshot(),
            }));
        }
    }

    fn on_action_finished(&mut self, id: ActionId) {
        if self.animations.fall == Some(id) && self.state == ChestState::Opening {
            self.state = ChestState::AwaitingResult;
            return;
        }

        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.highlight_waiters)
            .into_iter()
            .partition(|(action, _)| *action == id);
        self.highlight_waiters = pending;
        for (_, waiter) in done {
            let _ = waiter.send(());
        }

        let active = self
            .active_highlight
            .and_then(|h| self.animations.highlight(h));
        if active == Some(id) {
            self.active_highlight = None;
            self.state = ChestState::Idle;
        }
    }

    fn update_cut_scene(
        &mut self,
        dt: f32,
        scene: &Scene,
        camera: &mut CameraRig,
        music: &mut Music,
        events: &EventBus<OutboundEvent>,
    ) {
        let target = self.position(scene);
        let Some(cut_scene) = self.cut_scene.as_mut() else {
            return;
        };

        let timeline_events = cut_scene.timeline.update(dt);
        camera.apply_scripted_pose(cut_scene.timeline.value(), target);

        let finished = timeline_events.contains(&TimelineEvent::Completed)
            || !cut_scene.timeline.is_active();
        if !finished {
            return;
        }

        let callback = cut_scene.on_complete.take();
        self.cut_scene = None;
        camera.set_drive(CameraDrive::Interactive);
        events.publish(OutboundEvent::ShowUi);
        music.play_ambient();
        log::debug!("cut-scene completed");
        if let Some(callback) = callback {
            callback();
        }
    }
}

fn bind_clip(
    mixer: &mut AnimationMixer,
    model: &Arc<ModelData>,
    clip: &str,
    root: Entity,
    scene: &Scene,
) -> Option<ActionId> {
    let action = model
        .animation(clip)
        .map(|clip| mixer.clip_action(clip, root, scene));
    if action.is_none() {
        log::debug!("model has no '{clip}' clip");
    }
    action
}

impl Disposable for LootChest {
    fn dispose(&mut self, scene: &mut Scene) -> ReleasedResources {
        if let Some(mut cut_scene) = self.cut_scene.take() {
            cut_scene.timeline.kill();
        }
        self.unbind(scene)
    }
}
