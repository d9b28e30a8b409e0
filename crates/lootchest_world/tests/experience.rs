use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use lootchest_assets::{
    AnimationClip, AssetKind, AssetPath, Channel, ChannelOutputs, Interpolation, ManifestEntry,
    MeshData, ModelData, ResourceItem, ResourceManifest, Resources,
};
use lootchest_core::{ChestSelection, OutboundEvent, Sizes, transform::Transform};
use lootchest_scene::{HeadlessRenderer, LoopMode};
use lootchest_world::{
    Callback, ChestState, Experience, ExperienceConfig, Highlight, LogAudio,
};

const FRAME: Duration = Duration::from_millis(16);

fn lid_clip(name: &str, duration: f32) -> AnimationClip {
    AnimationClip::new(
        name,
        vec![Channel::new(
            "lid",
            vec![0.0, duration],
            ChannelOutputs::Translations(vec![Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 1.0, 0.0)]),
            Interpolation::Linear,
        )],
    )
}

/// A chest with `meshes` mesh nodes and the given clips.
fn chest(meshes: usize, clips: &[&str]) -> ModelData {
    let mut model = ModelData::new();
    let body = model.push_node("body", Transform::default(), None);
    model.push_primitive(body, MeshData::cuboid(1.0, 0.5, 1.0), None);
    let lid = model.push_node("lid", Transform::from_xyz(0.0, 0.5, 0.0), Some(body));
    for i in 1..meshes {
        let gem = model.push_node(format!("gem{i}"), Transform::from_xyz(0.2 * i as f32, 0.0, 0.0), Some(lid));
        model.push_primitive(gem, MeshData::cuboid(0.1, 0.1, 0.1), None);
    }
    for clip in clips {
        model.push_animation(lid_clip(clip, 1.0));
    }
    model
}

fn trapdoor() -> ModelData {
    let mut model = ModelData::new();
    let floor = model.push_node("floor", Transform::default(), None);
    model.push_primitive(floor, MeshData::cuboid(2.0, 0.05, 2.0), None);
    model.push_animation(AnimationClip::new(
        "open",
        vec![Channel::new(
            "floor",
            vec![0.0, 0.5],
            ChannelOutputs::Translations(vec![Vec3::ZERO, Vec3::new(0.0, -5.0, 0.0)]),
            Interpolation::Linear,
        )],
    ));
    model
}

const ALL_CLIPS: &[&str] = &["shake", "fall", "success", "failure"];

fn manifest(names: &[&str]) -> ResourceManifest {
    ResourceManifest::new(
        names
            .iter()
            .map(|name| {
                ManifestEntry::new(
                    *name,
                    AssetKind::GlbModel,
                    AssetPath::Single(format!("/models/{name}.glb")),
                )
            })
            .collect(),
    )
}

fn experience(models: Vec<(&str, ModelData)>) -> Experience<HeadlessRenderer> {
    let names: Vec<&str> = models.iter().map(|(name, _)| *name).collect();
    let mut experience = Experience::new(
        ExperienceConfig::default(),
        Sizes::new(800, 600, 1.0),
        HeadlessRenderer::new(),
        Resources::new(manifest(&names)),
        Box::new(LogAudio),
    );
    for (name, model) in models {
        experience
            .resources_mut()
            .source_loaded(name, ResourceItem::Model(Arc::new(model)));
    }
    experience.advance(FRAME);
    experience
}

fn select(experience: &mut Experience<HeadlessRenderer>, model: &str) {
    experience.select_chest(ChestSelection {
        id: model.to_string(),
        name: model.to_string(),
        model: model.to_string(),
    });
}

fn counter() -> (Rc<Cell<u32>>, Callback) {
    let count = Rc::new(Cell::new(0));
    let inner = count.clone();
    (count, Box::new(move || inner.set(inner.get() + 1)))
}

#[test]
fn swapping_chests_keeps_one_body_and_one_model() {
    let mut experience = experience(vec![
        ("trapdoor", trapdoor()),
        ("chestA", chest(2, ALL_CLIPS)),
        ("chestB", chest(4, ALL_CLIPS)),
    ]);
    select(&mut experience, "chestA");
    experience.advance(FRAME);
    select(&mut experience, "chestB");
    experience.advance(FRAME);

    let world = experience.world();
    let physics = world.physics().unwrap();
    assert_eq!(physics.dynamic_body_count(), 1);
    assert_eq!(physics.body_count(), 2);

    let chest = world.chest().unwrap();
    assert_eq!(chest.model_name(), Some("chestB"));
    assert_eq!(chest.anchor_count(), 4);

    let scene = experience.scene();
    assert!(scene.find_by_name(scene.root(), "chestA").is_none());
    assert!(scene.find_by_name(scene.root(), "chestB").is_some());
    assert_eq!(experience.renderer().released.meshes.len(), 2);
}

#[test]
fn adding_bodies_twice_is_a_no_op() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chestA", chest(1, ALL_CLIPS))]);
    select(&mut experience, "chestA");
    select(&mut experience, "chestA");
    experience.advance(FRAME);

    let physics = experience.world().physics().unwrap();
    assert!(physics.has_box());
    assert!(physics.has_floor());
    assert_eq!(physics.body_count(), 2);
}

#[test]
fn restarting_a_highlight_never_leaves_two_repeating() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chestA", chest(1, ALL_CLIPS))]);
    select(&mut experience, "chestA");

    let repeating = |experience: &Experience<HeadlessRenderer>| {
        let chest = experience.world().chest().unwrap();
        let set = chest.animations();
        [set.success, set.failure]
            .into_iter()
            .flatten()
            .filter(|&id| {
                chest
                    .mixer()
                    .action(id)
                    .is_some_and(|a| matches!(a.loop_mode, LoopMode::Repeat { .. }))
            })
            .count()
    };

    let (done, on_done) = counter();
    experience.reveal(Highlight::Success, on_done);
    assert_eq!(repeating(&experience), 1);
    experience.advance(Duration::from_millis(300));

    let (again, on_again) = counter();
    experience.reveal(Highlight::Success, on_again);
    assert!(repeating(&experience) <= 1);

    let chest = experience.world().chest().unwrap();
    let success = chest.mixer().action(chest.animations().success.unwrap()).unwrap();
    assert_eq!(success.loop_mode, LoopMode::Once);
    assert!(success.time() < 0.1);

    let (failed, on_failed) = counter();
    experience.reveal(Highlight::Failure, on_failed);
    assert!(repeating(&experience) <= 1);

    for _ in 0..10 {
        experience.advance(Duration::from_millis(200));
        assert!(repeating(&experience) <= 1);
    }
    assert_eq!(done.get(), 1);
    assert_eq!(again.get(), 1);
    assert_eq!(failed.get(), 1);
    assert_eq!(experience.world().chest().unwrap().state(), ChestState::Idle);
}

#[test]
fn skipping_the_cut_scene_always_lands_on_the_resting_pose() {
    for skip_after in [0, 1, 30, 120, 240, 490] {
        let mut experience =
            experience(vec![("trapdoor", trapdoor()), ("chestA", chest(1, ALL_CLIPS))]);
        select(&mut experience, "chestA");

        let (opened, on_open) = counter();
        assert!(experience.open_chest(on_open));
        for _ in 0..skip_after {
            experience.advance(FRAME);
        }

        let (skipped, on_skip) = counter();
        assert!(experience.skip_cut_scene(on_skip));
        assert_eq!(skipped.get(), 1, "skip callback runs synchronously");

        let camera = experience.camera();
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 3.0, 5.0), 1e-5));
        let chest = experience.world().chest().unwrap().position(experience.scene());
        let facing = (chest - camera.position()).normalize();
        assert!(camera.transform().forward().abs_diff_eq(facing, 1e-4));

        for _ in 0..600 {
            experience.advance(FRAME);
        }
        assert_eq!(opened.get(), 0, "cancelled cut-scene never completes");
    }
}

#[test]
fn cut_scene_hides_and_shows_the_ui() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chestA", chest(1, ALL_CLIPS))]);
    select(&mut experience, "chestA");
    let mut ui = experience.subscribe();

    let (opened, on_open) = counter();
    experience.open_chest(on_open);
    for _ in 0..9 {
        experience.advance(Duration::from_secs(1));
    }

    assert_eq!(opened.get(), 1);
    let visibility: Vec<_> = ui
        .drain()
        .into_iter()
        .filter(|e| matches!(e, OutboundEvent::ShowUi | OutboundEvent::HideUi))
        .collect();
    assert_eq!(visibility, vec![OutboundEvent::HideUi, OutboundEvent::ShowUi]);
    assert_eq!(
        experience.world().chest().unwrap().state(),
        ChestState::AwaitingResult
    );
}

#[test]
fn zero_length_frame_moves_nothing() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chestA", chest(1, ALL_CLIPS))]);
    select(&mut experience, "chestA");
    experience.advance(Duration::from_millis(100));

    let before = experience.world().physics().unwrap().box_position().unwrap();
    experience.advance(Duration::ZERO);
    let after = experience.world().physics().unwrap().box_position().unwrap();
    assert_eq!(before, after);
}

#[test]
fn world_waits_for_every_manifest_entry() {
    let mut experience = Experience::new(
        ExperienceConfig::default(),
        Sizes::default(),
        HeadlessRenderer::new(),
        Resources::new(manifest(&["trapdoor", "chestA"])),
        Box::new(LogAudio),
    );
    let mut ready = experience.resources_mut().on_ready();

    experience
        .resources_mut()
        .source_loaded("trapdoor", ResourceItem::Model(Arc::new(trapdoor())));
    experience.advance(FRAME);
    assert!(!experience.world().is_ready());
    assert!(ready.try_recv().is_err());

    experience
        .resources_mut()
        .source_loaded("chestA", ResourceItem::Model(Arc::new(chest(1, ALL_CLIPS))));
    experience.advance(FRAME);
    assert!(experience.world().is_ready());
    assert!(ready.try_recv().is_ok());

    assert!(
        !experience
            .resources_mut()
            .source_loaded("chestA", ResourceItem::Model(Arc::new(chest(1, ALL_CLIPS))))
    );
}

#[test]
fn chest_without_highlights_still_shakes() {
    let mut experience = experience(vec![
        ("trapdoor", trapdoor()),
        ("chestA", chest(1, &["shake", "fall"])),
    ]);
    select(&mut experience, "chestA");
    experience.advance(FRAME);

    let chest = experience.world().chest().unwrap();
    let shake = chest.animations().shake.unwrap();
    assert!(chest.mixer().is_running(shake));
    assert_eq!(chest.animations().success, None);
    let state = chest.state();

    let (done, on_done) = counter();
    experience.reveal(Highlight::Success, on_done);
    assert_eq!(done.get(), 1);
    assert_eq!(experience.world().chest().unwrap().state(), state);
}

#[test]
fn default_chest_loads_after_the_fallback_delay() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chest", chest(1, ALL_CLIPS))]);
    experience.advance(Duration::from_secs(2));
    assert!(!experience.world().chest().unwrap().is_loaded());

    experience.advance(Duration::from_millis(1100));
    assert_eq!(experience.world().chest().unwrap().model_name(), Some("chest"));
}

#[test]
fn unknown_selection_keeps_the_fallback_running() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chest", chest(1, ALL_CLIPS))]);
    select(&mut experience, "no-such-model");
    assert!(!experience.world().chest().unwrap().is_loaded());
    assert!(experience.world().selected().is_none());

    experience.advance(Duration::from_millis(3100));
    assert_eq!(experience.world().chest().unwrap().model_name(), Some("chest"));
}

#[test]
fn selection_before_ready_is_applied_once_ready() {
    let mut experience = Experience::new(
        ExperienceConfig::default(),
        Sizes::default(),
        HeadlessRenderer::new(),
        Resources::new(manifest(&["trapdoor", "chestA"])),
        Box::new(LogAudio),
    );
    experience.inbound().publish(lootchest_core::InboundEvent::ChestSelected(ChestSelection {
        id: "a".into(),
        name: "Chest A".into(),
        model: "chestA".into(),
    }));
    experience.advance(FRAME);
    assert!(experience.world().pending_selection().is_some());

    experience
        .resources_mut()
        .source_loaded("trapdoor", ResourceItem::Model(Arc::new(trapdoor())));
    experience
        .resources_mut()
        .source_loaded("chestA", ResourceItem::Model(Arc::new(chest(1, ALL_CLIPS))));
    experience.advance(FRAME);

    assert_eq!(experience.world().chest().unwrap().model_name(), Some("chestA"));
    assert_eq!(experience.world().selected().unwrap().name, "Chest A");
}

#[test]
fn anchors_reach_the_ui_each_frame() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chestA", chest(3, ALL_CLIPS))]);
    let mut ui = experience.subscribe();
    select(&mut experience, "chestA");
    experience.advance(FRAME);

    let points = ui
        .drain()
        .into_iter()
        .find_map(|e| match e {
            OutboundEvent::ChestPointsUpdated(points) => Some(points),
            _ => None,
        })
        .unwrap();
    assert_eq!(points.points.len(), 3);
    assert_eq!(points.camera.viewport.x, 800);
}

#[test]
fn reset_round_returns_the_chest_to_the_drop_point() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chestA", chest(1, ALL_CLIPS))]);
    select(&mut experience, "chestA");
    experience.open_chest(Box::new(|| {}));
    for _ in 0..60 {
        experience.advance(FRAME);
    }

    experience.reset_round();
    let physics = experience.world().physics().unwrap();
    assert_eq!(physics.box_position(), Some(Vec3::new(0.0, 4.0, 0.0)));
    assert_eq!(experience.world().chest().unwrap().state(), ChestState::Idle);
    assert_eq!(physics.floor_position(), Some(Vec3::ZERO));
}

#[test]
fn destroy_releases_everything_once() {
    let mut experience = experience(vec![("trapdoor", trapdoor()), ("chestA", chest(2, ALL_CLIPS))]);
    select(&mut experience, "chestA");
    experience.advance(FRAME);
    let ui = experience.subscribe();

    experience.destroy();
    let released = experience.renderer().released.clone();
    assert_eq!(released.meshes.len(), 3);
    assert_eq!(experience.scene().node_count(), 1);
    assert!(experience.renderer().disposed);
    assert!(ui.is_disconnected());
    assert_eq!(experience.inbound().subscriber_count(), 0);

    experience.destroy();
    assert_eq!(experience.renderer().released, released);
    assert!(experience.is_destroyed());
}
