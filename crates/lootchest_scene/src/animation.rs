//! Clip playback on scene nodes.
//!
//! An [`AnimationMixer`] owns actions, each one a clip bound to a subtree of
//! the scene. Channels find their node by name below the action's root when
//! the action is created. Every update advances the running actions, writes
//! sampled values into node transforms and reports loop/finish events. When
//! two actions drive the same node, the one played most recently wins.

use std::collections::HashMap;
use std::sync::Arc;

use flecs_ecs::prelude::Entity;
use lootchest_assets::{AnimationClip, ChannelValue};
use lootchest_core::transform::Transform;

use crate::Scene;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    /// `None` repeats forever.
    Repeat { repetitions: Option<u32> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixerEvent {
    Loop(ActionId),
    Finished(ActionId),
}

pub struct AnimationAction {
    clip: Arc<AnimationClip>,
    root: Entity,
    targets: Vec<Option<Entity>>,
    pub loop_mode: LoopMode,
    pub clamp_when_finished: bool,
    pub time_scale: f32,
    time: f32,
    loops_done: u32,
    enabled: bool,
    paused: bool,
    finished: bool,
    play_order: u64,
}

impl AnimationAction {
    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Scheduled in the mixer, whether paused or not.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advancing on the next update.
    pub fn is_running(&self) -> bool {
        self.enabled && !self.paused && !self.finished && self.time_scale != 0.0
    }

    fn rewind(&mut self) {
        self.time = 0.0;
        self.loops_done = 0;
        self.paused = false;
        self.finished = false;
    }

    /// Moves time forward, pushing any loop or finish events.
    fn advance(&mut self, id: ActionId, dt: f32, events: &mut Vec<MixerEvent>) {
        if !self.is_running() {
            return;
        }
        let duration = self.clip.duration;
        let mut time = self.time + dt * self.time_scale;

        match self.loop_mode {
            LoopMode::Once => {
                if time >= duration {
                    time = duration;
                    self.finished = true;
                }
            }
            // Zero-length clips hold their single pose; a finite repeat of
            // one finishes on its first update.
            LoopMode::Repeat { repetitions } if duration <= 0.0 => {
                time = 0.0;
                if repetitions.is_some() {
                    self.finished = true;
                }
            }
            // Several wraps in one update report a single loop event.
            LoopMode::Repeat { repetitions } => {
                if time >= duration {
                    let wraps = (time / duration).floor();
                    let loops = self.loops_done.saturating_add(wraps.min(u32::MAX as f32) as u32);
                    match repetitions {
                        Some(n) if loops >= n => {
                            self.loops_done = n;
                            time = duration;
                            self.finished = true;
                        }
                        _ => {
                            self.loops_done = loops;
                            time %= duration;
                            events.push(MixerEvent::Loop(id));
                        }
                    }
                }
            }
        }

        self.time = time.max(0.0);
        if self.finished {
            events.push(MixerEvent::Finished(id));
            if self.clamp_when_finished {
                self.paused = true;
            } else {
                self.enabled = false;
            }
        }
    }

    fn apply(&self, scene: &mut Scene) {
        for (channel, target) in self.clip.channels.iter().zip(&self.targets) {
            let (Some(target), Some(value)) = (target, channel.sample(self.time)) else {
                continue;
            };
            scene.with_transform(*target, |t| match value {
                ChannelValue::Translation(v) => t.translation = v,
                ChannelValue::Rotation(q) => t.rotation = q,
                ChannelValue::Scale(v) => t.scale = v,
            });
        }
    }
}

#[derive(Default)]
pub struct AnimationMixer {
    actions: Vec<Option<AnimationAction>>,
    rest_pose: HashMap<Entity, Transform>,
    plays: u64,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the action playing `clip` on `root`, creating it on first use.
    /// New actions repeat forever, are unclamped and start stopped.
    pub fn clip_action(&mut self, clip: Arc<AnimationClip>, root: Entity, scene: &Scene) -> ActionId {
        let existing = self.actions.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|a| a.root == root && Arc::ptr_eq(&a.clip, &clip))
        });
        if let Some(index) = existing {
            return ActionId(index);
        }

        let targets: Vec<Option<Entity>> = clip
            .channels
            .iter()
            .map(|channel| {
                let target = scene.find_by_name(root, &channel.target);
                if target.is_none() {
                    log::debug!("clip '{}' targets missing node '{}'", clip.name, channel.target);
                }
                target
            })
            .collect();

        for &target in targets.iter().flatten() {
            if let Some(transform) = scene.transform(target) {
                self.rest_pose.entry(target).or_insert(transform);
            }
        }

        let action = AnimationAction {
            clip,
            root,
            targets,
            loop_mode: LoopMode::Repeat { repetitions: None },
            clamp_when_finished: false,
            time_scale: 1.0,
            time: 0.0,
            loops_done: 0,
            enabled: false,
            paused: false,
            finished: false,
            play_order: 0,
        };

        // Slots freed by `uncache_root` are reused before the list grows.
        match self.actions.iter().position(Option::is_none) {
            Some(index) => {
                self.actions[index] = Some(action);
                ActionId(index)
            }
            None => {
                self.actions.push(Some(action));
                ActionId(self.actions.len() - 1)
            }
        }
    }

    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.get(id.0).and_then(Option::as_ref)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut AnimationAction> {
        self.actions.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Schedules the action without touching its time.
    pub fn play(&mut self, id: ActionId) -> bool {
        self.plays += 1;
        let order = self.plays;
        self.action_mut(id)
            .map(|a| {
                if !a.enabled {
                    a.play_order = order;
                }
                a.enabled = true;
            })
            .is_some()
    }

    /// Rewinds to the start, unpaused and enabled.
    pub fn reset(&mut self, id: ActionId) -> bool {
        self.plays += 1;
        let order = self.plays;
        self.action_mut(id)
            .map(|a| {
                a.rewind();
                a.enabled = true;
                a.play_order = order;
            })
            .is_some()
    }

    /// Rewinds and unschedules the action, returning its nodes to rest.
    pub fn stop(&mut self, id: ActionId, scene: &mut Scene) -> bool {
        let Some(action) = self.action_mut(id) else {
            return false;
        };
        action.rewind();
        action.enabled = false;
        self.restore_rest_pose(id, scene);
        true
    }

    pub fn set_paused(&mut self, id: ActionId, paused: bool) -> bool {
        self.action_mut(id).map(|a| a.paused = paused).is_some()
    }

    pub fn set_loop(&mut self, id: ActionId, mode: LoopMode) -> bool {
        self.action_mut(id).map(|a| a.loop_mode = mode).is_some()
    }

    pub fn is_running(&self, id: ActionId) -> bool {
        self.action(id).is_some_and(AnimationAction::is_running)
    }

    pub fn stop_all(&mut self, scene: &mut Scene) {
        for index in 0..self.actions.len() {
            self.stop(ActionId(index), scene);
        }
    }

    /// Forgets every action bound below `root`.
    pub fn uncache_root(&mut self, root: Entity) {
        for slot in &mut self.actions {
            if slot.as_ref().is_some_and(|a| a.root == root) {
                if let Some(action) = slot.take() {
                    for target in action.targets.into_iter().flatten() {
                        self.rest_pose.remove(&target);
                    }
                }
            }
        }
    }

    pub fn action_count(&self) -> usize {
        self.actions.iter().flatten().count()
    }

    pub fn update(&mut self, dt: f32, scene: &mut Scene) -> Vec<MixerEvent> {
        let mut events = Vec::new();
        for (index, slot) in self.actions.iter_mut().enumerate() {
            if let Some(action) = slot {
                action.advance(ActionId(index), dt, &mut events);
            }
        }

        let mut active: Vec<&AnimationAction> =
            self.actions.iter().flatten().filter(|a| a.enabled).collect();
        active.sort_by_key(|a| a.play_order);
        for action in active {
            action.apply(scene);
        }

        // Unclamped actions that just finished hand their nodes back.
        for event in &events {
            if let MixerEvent::Finished(id) = *event {
                if self.action(id).is_some_and(|a| !a.enabled) {
                    self.restore_rest_pose(id, scene);
                }
            }
        }
        events
    }

    fn restore_rest_pose(&self, id: ActionId, scene: &mut Scene) {
        let Some(action) = self.action(id) else {
            return;
        };
        for &target in action.targets.iter().flatten() {
            let driven_elsewhere = self.actions.iter().enumerate().any(|(i, slot)| {
                i != id.0
                    && slot
                        .as_ref()
                        .is_some_and(|other| other.enabled && other.targets.contains(&Some(target)))
            });
            if driven_elsewhere {
                continue;
            }
            if let Some(rest) = self.rest_pose.get(&target) {
                scene.set_transform(target, *rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use lootchest_assets::{Channel, ChannelOutputs, Interpolation, ModelData};

    fn scene_with_lid() -> (Scene, Entity, Entity) {
        let mut model = ModelData::new();
        let root = model.push_node("chest", Transform::default(), None);
        model.push_node("lid", Transform::default(), Some(root));

        let mut scene = Scene::new();
        let group = scene.spawn_model(&model, "chestA", None);
        let lid = scene.find_by_name(group, "lid").unwrap();
        (scene, group, lid)
    }

    fn lift(duration: f32) -> Arc<AnimationClip> {
        Arc::new(AnimationClip::new(
            "lift",
            vec![Channel::new(
                "lid",
                vec![0.0, duration],
                ChannelOutputs::Translations(vec![Vec3::ZERO, Vec3::Y]),
                Interpolation::Linear,
            )],
        ))
    }

    #[test]
    fn clip_action_is_cached_per_root() {
        let (scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let clip = lift(1.0);
        let a = mixer.clip_action(clip.clone(), group, &scene);
        let b = mixer.clip_action(clip, group, &scene);
        assert_eq!(a, b);
        assert_eq!(mixer.action_count(), 1);
    }

    #[test]
    fn playing_action_drives_its_node() {
        let (mut scene, group, lid) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.play(id);

        mixer.update(0.5, &mut scene);
        let t = scene.transform(lid).unwrap();
        assert!(t.translation.abs_diff_eq(Vec3::Y * 0.5, 1e-5));
    }

    #[test]
    fn stopped_action_does_not_advance() {
        let (mut scene, group, lid) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        mixer.clip_action(lift(1.0), group, &scene);

        assert!(mixer.update(0.5, &mut scene).is_empty());
        assert_eq!(scene.transform(lid).unwrap().translation, Vec3::ZERO);
    }

    #[test]
    fn once_clamped_holds_last_frame() {
        let (mut scene, group, lid) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.set_loop(id, LoopMode::Once);
        mixer.action_mut(id).unwrap().clamp_when_finished = true;
        mixer.play(id);

        let events = mixer.update(2.0, &mut scene);
        assert_eq!(events, vec![MixerEvent::Finished(id)]);
        assert!(mixer.action(id).unwrap().is_paused());
        assert!(scene.transform(lid).unwrap().translation.abs_diff_eq(Vec3::Y, 1e-5));

        assert!(mixer.update(1.0, &mut scene).is_empty());
    }

    #[test]
    fn once_unclamped_returns_to_rest() {
        let (mut scene, group, lid) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.set_loop(id, LoopMode::Once);
        mixer.play(id);

        mixer.update(2.0, &mut scene);
        assert!(!mixer.action(id).unwrap().is_enabled());
        assert_eq!(scene.transform(lid).unwrap().translation, Vec3::ZERO);
    }

    #[test]
    fn finite_repeat_reports_loops_then_finishes() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.set_loop(id, LoopMode::Repeat { repetitions: Some(2) });
        mixer.play(id);

        assert_eq!(mixer.update(1.5, &mut scene), vec![MixerEvent::Loop(id)]);
        assert_eq!(mixer.update(1.0, &mut scene), vec![MixerEvent::Finished(id)]);
    }

    #[test]
    fn infinite_repeat_never_finishes() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.play(id);

        for _ in 0..10 {
            let events = mixer.update(0.75, &mut scene);
            assert!(!events.contains(&MixerEvent::Finished(id)));
        }
        assert!(mixer.is_running(id));
    }

    #[test]
    fn reset_restarts_finished_action() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.set_loop(id, LoopMode::Once);
        mixer.play(id);
        mixer.update(2.0, &mut scene);

        mixer.reset(id);
        assert!(mixer.is_running(id));
        assert_eq!(mixer.action(id).unwrap().time(), 0.0);
    }

    #[test]
    fn latest_played_action_wins_shared_nodes() {
        let (mut scene, group, lid) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let up = mixer.clip_action(lift(1.0), group, &scene);
        let down = mixer.clip_action(
            Arc::new(AnimationClip::new(
                "sink",
                vec![Channel::new(
                    "lid",
                    vec![0.0, 1.0],
                    ChannelOutputs::Translations(vec![Vec3::ZERO, -Vec3::Y]),
                    Interpolation::Linear,
                )],
            )),
            group,
            &scene,
        );
        mixer.play(down);
        mixer.play(up);

        mixer.update(1.0 - 1e-3, &mut scene);
        assert!(scene.transform(lid).unwrap().translation.y > 0.9);

        mixer.reset(down);
        mixer.update(1.0 - 1e-3, &mut scene);
        assert!(scene.transform(lid).unwrap().translation.y < -0.9);
    }

    fn pose() -> Arc<AnimationClip> {
        Arc::new(AnimationClip::new(
            "pose",
            vec![Channel::new(
                "lid",
                vec![0.0],
                ChannelOutputs::Translations(vec![Vec3::Y]),
                Interpolation::Linear,
            )],
        ))
    }

    #[test]
    fn zero_length_clip_repeating_forever_holds_its_pose() {
        let (mut scene, group, lid) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(pose(), group, &scene);
        mixer.play(id);

        for _ in 0..3 {
            assert!(mixer.update(0.016, &mut scene).is_empty());
        }
        assert!(mixer.is_running(id));
        assert_eq!(mixer.action(id).unwrap().time(), 0.0);
        assert_eq!(scene.transform(lid).unwrap().translation, Vec3::Y);
    }

    #[test]
    fn clip_without_channels_does_not_stall_update() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(Arc::new(AnimationClip::new("shake", vec![])), group, &scene);
        mixer.play(id);

        assert!(mixer.update(0.016, &mut scene).is_empty());
        assert!(mixer.is_running(id));
    }

    #[test]
    fn zero_length_clip_played_once_finishes_immediately() {
        let (mut scene, group, lid) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(pose(), group, &scene);
        mixer.set_loop(id, LoopMode::Once);
        mixer.action_mut(id).unwrap().clamp_when_finished = true;
        mixer.play(id);

        assert_eq!(mixer.update(0.016, &mut scene), vec![MixerEvent::Finished(id)]);
        assert!(mixer.action(id).unwrap().is_paused());
        assert_eq!(scene.transform(lid).unwrap().translation, Vec3::Y);
    }

    #[test]
    fn zero_length_clip_with_finite_repeats_finishes_once() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(pose(), group, &scene);
        mixer.set_loop(id, LoopMode::Repeat { repetitions: Some(3) });
        mixer.play(id);

        assert_eq!(mixer.update(0.016, &mut scene), vec![MixerEvent::Finished(id)]);
        assert!(mixer.update(0.016, &mut scene).is_empty());
        assert!(!mixer.is_running(id));
    }

    #[test]
    fn tiny_clip_wraps_many_times_in_one_update() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1e-9), group, &scene);
        mixer.play(id);

        assert_eq!(mixer.update(1.0, &mut scene), vec![MixerEvent::Loop(id)]);
        assert!(mixer.action(id).unwrap().time() < 1e-9);
    }

    #[test]
    fn multi_wrap_update_counts_toward_repetitions() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.set_loop(id, LoopMode::Repeat { repetitions: Some(3) });
        mixer.play(id);

        assert_eq!(mixer.update(2.5, &mut scene), vec![MixerEvent::Loop(id)]);
        assert_eq!(mixer.update(0.5, &mut scene), vec![MixerEvent::Finished(id)]);
    }

    #[test]
    fn uncached_slots_are_reused() {
        let (scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        for _ in 0..5 {
            mixer.clip_action(lift(1.0), group, &scene);
            mixer.clip_action(pose(), group, &scene);
            mixer.uncache_root(group);
        }
        mixer.clip_action(lift(1.0), group, &scene);

        assert_eq!(mixer.actions.len(), 2);
        assert_eq!(mixer.action_count(), 1);
    }

    #[test]
    fn uncache_root_drops_actions() {
        let (mut scene, group, _) = scene_with_lid();
        let mut mixer = AnimationMixer::new();
        let id = mixer.clip_action(lift(1.0), group, &scene);
        mixer.uncache_root(group);

        assert!(mixer.action(id).is_none());
        assert!(!mixer.play(id));
        assert!(mixer.update(1.0, &mut scene).is_empty());
    }
}
