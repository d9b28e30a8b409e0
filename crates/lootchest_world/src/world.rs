use std::sync::Arc;

use lootchest_assets::Resources;
use lootchest_core::{ChestSelection, EventBus, EventReceiver, InboundEvent, OutboundEvent};
use lootchest_physics::PhysicsWorld;
use lootchest_scene::{Disposable, ReleasedResources, Scene};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::{
    camera::CameraRig,
    config::ExperienceConfig,
    loot_chest::{Callback, Highlight, LootChest},
    music::{AudioBackend, LogAudio, Music},
    trapdoor::Trapdoor,
};

/// Everything that only exists once resources are ready.
pub struct WorldParts {
    pub physics: PhysicsWorld,
    pub trapdoor: Option<Trapdoor>,
    pub chest: LootChest,
    pub music: Music,
}

struct PendingReveal {
    finished: oneshot::Receiver<()>,
    on_done: Callback,
}

/// Composition root of the 3D content. Waits for the resource table, then
/// builds physics, trapdoor, chest and music and drives them every frame.
pub struct World {
    config: ExperienceConfig,
    ready: Option<oneshot::Receiver<()>>,
    inbound: EventReceiver<InboundEvent>,
    outbound: Arc<EventBus<OutboundEvent>>,
    audio: Option<Box<dyn AudioBackend>>,
    parts: Option<WorldParts>,
    pending_selection: Option<ChestSelection>,
    selected: Option<ChestSelection>,
    since_ready: f32,
    chest_requested: bool,
    reveals: Vec<PendingReveal>,
    released: ReleasedResources,
    destroyed: bool,
}

impl World {
    pub fn new(
        config: ExperienceConfig,
        audio: Box<dyn AudioBackend>,
        ready: oneshot::Receiver<()>,
        inbound: EventReceiver<InboundEvent>,
        outbound: Arc<EventBus<OutboundEvent>>,
    ) -> Self {
        Self {
            config,
            ready: Some(ready),
            inbound,
            outbound,
            audio: Some(audio),
            parts: None,
            pending_selection: None,
            selected: None,
            since_ready: 0.0,
            chest_requested: false,
            reveals: Vec::new(),
            released: ReleasedResources::default(),
            destroyed: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.parts.is_some()
    }

    pub fn parts(&self) -> Option<&WorldParts> {
        self.parts.as_ref()
    }

    pub fn chest(&self) -> Option<&LootChest> {
        self.parts.as_ref().map(|p| &p.chest)
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.parts.as_ref().map(|p| &p.physics)
    }

    pub fn trapdoor(&self) -> Option<&Trapdoor> {
        self.parts.as_ref().and_then(|p| p.trapdoor.as_ref())
    }

    pub fn music(&self) -> Option<&Music> {
        self.parts.as_ref().map(|p| &p.music)
    }

    pub fn selected(&self) -> Option<&ChestSelection> {
        self.selected.as_ref()
    }

    pub fn pending_selection(&self) -> Option<&ChestSelection> {
        self.pending_selection.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Resources freed since the last call, for the renderer to drop.
    pub fn take_released(&mut self) -> ReleasedResources {
        std::mem::take(&mut self.released)
    }

    pub fn update(
        &mut self,
        dt: f32,
        resources: &Resources,
        scene: &mut Scene,
        camera: &mut CameraRig,
    ) {
        if self.destroyed {
            return;
        }

        self.poll_ready(resources, scene);

        for event in self.inbound.drain() {
            log::debug!("ui event '{}'", event.name());
            match event {
                InboundEvent::ChestSelected(selection) => {
                    self.select_chest(selection, resources, scene)
                }
            }
        }

        let Some(parts) = self.parts.as_mut() else {
            return;
        };

        if !self.chest_requested {
            self.since_ready += dt;
            if self.since_ready >= self.config.world.fallback_seconds {
                let name = self.config.world.default_chest.clone();
                log::info!("no chest selected after {:.1}s, loading '{name}'", self.since_ready);
                self.chest_requested = true;
                match parts
                    .chest
                    .set_loot_chest(&name, resources, scene, &mut parts.physics)
                {
                    Ok(released) => self.released.merge(released),
                    Err(err) => log::warn!("default chest unavailable: {err}"),
                }
            }
        }

        parts.physics.update(dt);
        for impact in parts.physics.drain_impacts() {
            parts.music.play_impact(impact.velocity);
        }
        if let Some(trapdoor) = parts.trapdoor.as_mut() {
            trapdoor.update(dt, scene, &mut parts.physics);
        }
        parts.chest.update(
            dt,
            scene,
            &parts.physics,
            camera,
            &mut parts.music,
            &self.outbound,
        );
        parts.music.update(dt);

        // A dropped signal (highlights reset, chest swapped) still completes
        // the reveal.
        let mut pending = Vec::with_capacity(self.reveals.len());
        for mut reveal in std::mem::take(&mut self.reveals) {
            match reveal.finished.try_recv() {
                Err(TryRecvError::Empty) => pending.push(reveal),
                Ok(()) | Err(TryRecvError::Closed) => (reveal.on_done)(),
            }
        }
        self.reveals = pending;
    }

    fn poll_ready(&mut self, resources: &Resources, scene: &mut Scene) {
        let Some(ready) = self.ready.as_mut() else {
            return;
        };
        match ready.try_recv() {
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                log::error!("resource table went away before it was ready");
                self.ready = None;
            }
            Ok(()) => {
                self.ready = None;
                self.materialize(resources, scene);
            }
        }
    }

    fn materialize(&mut self, resources: &Resources, scene: &mut Scene) {
        let world = &self.config.world;
        if let Some(name) = &world.environment_map {
            match resources.cube_texture(name) {
                Some(map) => {
                    scene.set_environment(Some(Arc::clone(&map)));
                    scene.set_background(Some(map));
                    scene.set_environment_intensity(world.environment_intensity);
                }
                None => log::warn!("environment map '{name}' was not loaded"),
            }
        }

        let mut physics =
            PhysicsWorld::new(self.config.physics.gravity, self.config.physics.impact_threshold);
        let trapdoor = match Trapdoor::new(&self.config.trapdoor, resources, scene, &mut physics) {
            Ok(trapdoor) => Some(trapdoor),
            Err(err) => {
                log::error!("trapdoor unavailable: {err}");
                None
            }
        };

        let audio = self
            .audio
            .take()
            .unwrap_or_else(|| Box::new(LogAudio));
        let mut music = Music::new(self.config.music.clone(), audio);
        music.play_ambient();

        self.parts = Some(WorldParts {
            physics,
            trapdoor,
            chest: LootChest::new(&self.config.chest, &self.config.camera),
            music,
        });
        log::info!("world ready");

        if let Some(selection) = self.pending_selection.take() {
            self.select_chest(selection, resources, scene);
        }
    }

    /// Shows the selected chest, or remembers it until the world is ready.
    pub fn select_chest(
        &mut self,
        selection: ChestSelection,
        resources: &Resources,
        scene: &mut Scene,
    ) {
        let Some(parts) = self.parts.as_mut() else {
            log::debug!("chest '{}' selected before the world was ready", selection.name);
            self.pending_selection = Some(selection);
            return;
        };

        // A failed selection leaves the fallback timer running.
        match parts
            .chest
            .set_loot_chest(&selection.model, resources, scene, &mut parts.physics)
        {
            Ok(released) => {
                self.chest_requested = true;
                self.released.merge(released);
                self.selected = Some(selection);
            }
            Err(err) => log::warn!("cannot show chest '{}': {err}", selection.name),
        }
    }

    /// Opens the trapdoor, drops the chest and plays the cut-scene.
    /// `on_done` runs when the cut-scene ends or is skipped.
    pub fn open_chest(
        &mut self,
        scene: &mut Scene,
        camera: &mut CameraRig,
        on_done: Callback,
    ) -> bool {
        let Some(parts) = self.parts.as_mut() else {
            return false;
        };
        if !parts.chest.is_loaded() {
            log::warn!("open requested with no chest on display");
            return false;
        }

        parts.chest.reset_animations(scene);
        if let Some(trapdoor) = parts.trapdoor.as_mut() {
            trapdoor.open_trapdoor();
        }
        parts.chest.start_opening();
        parts
            .chest
            .start_opening_cut_scene(camera, &mut parts.music, &self.outbound, on_done);
        true
    }

    pub fn skip_cut_scene(
        &mut self,
        scene: &Scene,
        camera: &mut CameraRig,
        on_done: Callback,
    ) -> bool {
        let Some(parts) = self.parts.as_mut() else {
            return false;
        };
        parts
            .chest
            .end_opening_cut_scene(scene, camera, &mut parts.music, &self.outbound, on_done);
        true
    }

    /// Plays the highlight for `outcome`; `on_done` runs exactly once, when it
    /// finishes or right away if the chest has no such clip.
    pub fn reveal(&mut self, outcome: Highlight, on_done: Callback) {
        let finished = self
            .parts
            .as_mut()
            .and_then(|parts| parts.chest.start_highlight(outcome));
        match finished {
            Some(finished) => self.reveals.push(PendingReveal { finished, on_done }),
            None => on_done(),
        }
    }

    /// Closes the trapdoor and puts the chest back on the drop point.
    pub fn reset_round(&mut self, scene: &mut Scene) {
        let Some(parts) = self.parts.as_mut() else {
            return;
        };
        parts.chest.reset_round(scene, &mut parts.physics);
        if let Some(trapdoor) = parts.trapdoor.as_mut() {
            trapdoor.close_trapdoor(scene);
            trapdoor.update(0.0, scene, &mut parts.physics);
        }
    }

    /// Tears down everything the world created. Pending reveal callbacks are
    /// dropped. Safe to call twice.
    pub fn destroy(&mut self, scene: &mut Scene) -> ReleasedResources {
        let mut released = self.take_released();
        if self.destroyed {
            return released;
        }
        self.destroyed = true;
        self.reveals.clear();
        self.ready = None;

        if let Some(mut parts) = self.parts.take() {
            released.merge(parts.chest.dispose(scene));
            if let Some(trapdoor) = parts.trapdoor.as_mut() {
                released.merge(trapdoor.dispose(scene));
            }
            parts.music.stop_all();
            parts.physics.remove_box();
            parts.physics.remove_floor();
        }
        log::info!("world destroyed");
        released
    }
}
