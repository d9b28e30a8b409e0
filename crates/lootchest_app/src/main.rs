use std::path::{Path, PathBuf};

use lootchest_assets::{AssetKind, ResourceManifest, Resources};
use lootchest_core::{ChestSelection, InboundEvent};
use lootchest_input::{
    actions::{
        ACTION_NEXT_CHEST, ACTION_OPEN_CHEST, ACTION_ORBIT, ACTION_RESET, ACTION_REVEAL_FAILURE,
        ACTION_REVEAL_SUCCESS, ACTION_SKIP_CUT_SCENE, AXIS_ZOOM,
    },
    logical::InputMap,
    physical::{InputState, MouseButtonId, PhysicalInputId},
};
use lootchest_renderer::WgpuRenderer;
use lootchest_window::{ExperienceSetup, FrameHook, run_experience};
use lootchest_world::{Experience, ExperienceConfig, Highlight, LogAudio};
use winit::keyboard::KeyCode;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let assets = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets"));

    let config = load_config(&assets)?;
    let manifest = ResourceManifest::from_path(&assets.join("manifest.json"))?;
    let chests = chest_models(&manifest, &config.trapdoor.model);

    // Asset IO runs here; the frame loop stays on the main thread
    let runtime = tokio::runtime::Runtime::new()?;
    let resources = Resources::load(manifest, assets.clone(), runtime.handle().clone());

    let setup = ExperienceSetup {
        title: "Loot Chest".to_string(),
        config,
        resources,
        audio: Box::new(LogAudio),
        input_map: input_map(),
        on_frame: frame_hook(chests),
    };
    run_experience(setup)?;
    Ok(())
}

fn load_config(assets: &Path) -> Result<ExperienceConfig, lootchest_world::ExperienceError> {
    let path = assets.join("experience.json");
    if path.exists() {
        ExperienceConfig::from_path(&path)
    } else {
        log::info!("no {} found, using default config", path.display());
        Ok(ExperienceConfig::default())
    }
}

/// Every model in the manifest except the trapdoor, in manifest order.
fn chest_models(manifest: &ResourceManifest, trapdoor: &str) -> Vec<String> {
    manifest
        .entries()
        .iter()
        .filter(|e| matches!(e.kind, AssetKind::GltfModel | AssetKind::GlbModel))
        .filter(|e| e.name != trapdoor)
        .map(|e| e.name.clone())
        .collect()
}

fn input_map() -> InputMap {
    let mut input_map = InputMap::default();
    input_map
        .bind_mouse_button(MouseButtonId::Left, ACTION_ORBIT)
        .bind_axis(PhysicalInputId::wheel(), AXIS_ZOOM, 1.0);

    input_map.bind_keyboard_button(KeyCode::Space as u16, ACTION_OPEN_CHEST);
    input_map.bind_keyboard_button(KeyCode::Escape as u16, ACTION_SKIP_CUT_SCENE);
    input_map.bind_keyboard_button(KeyCode::KeyS as u16, ACTION_REVEAL_SUCCESS);
    input_map.bind_keyboard_button(KeyCode::KeyF as u16, ACTION_REVEAL_FAILURE);
    input_map.bind_keyboard_button(KeyCode::Tab as u16, ACTION_NEXT_CHEST);
    input_map.bind_keyboard_button(KeyCode::KeyR as u16, ACTION_RESET);
    input_map
}

fn frame_hook(chests: Vec<String>) -> FrameHook {
    let mut next = 0;

    Box::new(move |input: &InputState, experience: &mut Experience<WgpuRenderer>| {
        if input.held(ACTION_ORBIT) {
            let delta = input.pointer_delta;
            experience.rotate(delta.x, delta.y);
        }

        let zoom = input.axis(AXIS_ZOOM);
        if zoom != 0.0 {
            experience.zoom(zoom);
        }

        if input.just_pressed(ACTION_NEXT_CHEST) && !chests.is_empty() {
            let model = chests[next % chests.len()].clone();
            next += 1;
            experience
                .inbound()
                .publish(InboundEvent::ChestSelected(ChestSelection {
                    id: model.clone(),
                    name: model.clone(),
                    model,
                }));
        }

        if input.just_pressed(ACTION_OPEN_CHEST)
            && experience.open_chest(Box::new(|| log::info!("cut-scene finished")))
        {
            log::info!("opening chest");
        }

        if input.just_pressed(ACTION_SKIP_CUT_SCENE) {
            experience.skip_cut_scene(Box::new(|| log::info!("cut-scene skipped")));
        }

        if input.just_pressed(ACTION_REVEAL_SUCCESS) {
            experience.reveal(Highlight::Success, Box::new(|| log::info!("success shown")));
        }

        if input.just_pressed(ACTION_REVEAL_FAILURE) {
            experience.reveal(Highlight::Failure, Box::new(|| log::info!("failure shown")));
        }

        if input.just_pressed(ACTION_RESET) {
            experience.reset_round();
        }
    })
}

#[cfg(test)]
mod tests {
    use lootchest_assets::{AssetPath, ManifestEntry};

    use super::*;

    #[test]
    fn trapdoor_and_textures_are_not_chests() {
        let model = |name: &str| {
            ManifestEntry::new(name, AssetKind::GlbModel, AssetPath::Single(format!("{name}.glb")))
        };
        let manifest = ResourceManifest::new(vec![
            model("chestA"),
            model("trapdoor"),
            ManifestEntry::new("wood", AssetKind::Texture, AssetPath::Single("wood.png".into())),
            model("chestB"),
        ]);

        assert_eq!(chest_models(&manifest, "trapdoor"), vec!["chestA", "chestB"]);
    }
}
