use std::sync::Arc;
use std::time::Duration;

use lootchest_assets::Resources;
use lootchest_core::{
    ChestSelection, EventBus, EventReceiver, InboundEvent, OutboundEvent, Sizes, Time,
};
use lootchest_scene::{Renderer, Scene};

use crate::{
    camera::CameraRig,
    config::ExperienceConfig,
    loot_chest::{Callback, Highlight},
    music::AudioBackend,
    world::World,
};

/// The context everything else hangs off: scene, camera, renderer, resource
/// table and world. Construct one and pass it around; there is no global.
pub struct Experience<R: Renderer> {
    config: ExperienceConfig,
    time: Time,
    sizes: Sizes,
    scene: Scene,
    camera: CameraRig,
    renderer: R,
    resources: Resources,
    world: World,
    inbound: Arc<EventBus<InboundEvent>>,
    outbound: Arc<EventBus<OutboundEvent>>,
    destroyed: bool,
}

impl<R: Renderer> Experience<R> {
    pub fn new(
        config: ExperienceConfig,
        sizes: Sizes,
        mut renderer: R,
        mut resources: Resources,
        audio: Box<dyn AudioBackend>,
    ) -> Self {
        let inbound = Arc::new(EventBus::new());
        let outbound = Arc::new(EventBus::new());

        let world = World::new(
            config.clone(),
            audio,
            resources.on_ready(),
            inbound.subscribe(),
            Arc::clone(&outbound),
        );
        let camera = CameraRig::new(&config.camera, &sizes);
        renderer.resize(&sizes);

        log::info!(
            "experience created at {}x{} ({} assets to load)",
            sizes.width,
            sizes.height,
            resources.to_load()
        );

        Self {
            config,
            time: Time::default(),
            sizes,
            scene: Scene::new(),
            camera,
            renderer,
            resources,
            world,
            inbound,
            outbound,
            destroyed: false,
        }
    }

    pub fn config(&self) -> &ExperienceConfig {
        &self.config
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn sizes(&self) -> &Sizes {
        &self.sizes
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Test and tooling access to the resource table, e.g. to feed loads.
    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Bus the UI publishes chest selections on.
    pub fn inbound(&self) -> &Arc<EventBus<InboundEvent>> {
        &self.inbound
    }

    pub fn outbound(&self) -> &Arc<EventBus<OutboundEvent>> {
        &self.outbound
    }

    pub fn subscribe(&self) -> EventReceiver<OutboundEvent> {
        self.outbound.subscribe()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Camera first, then the renderer.
    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f32) {
        if self.destroyed {
            return;
        }
        self.sizes.resize(width, height);
        self.sizes.set_scale_factor(scale_factor);
        self.camera.resize(&self.sizes);
        self.renderer.resize(&self.sizes);
    }

    /// One frame on the wall clock.
    pub fn tick(&mut self) {
        self.time.update();
        self.step();
    }

    /// One frame of exactly `delta`.
    pub fn advance(&mut self, delta: Duration) {
        self.time.advance(delta);
        self.step();
    }

    fn step(&mut self) {
        if self.destroyed {
            return;
        }
        let dt = self.time.delta_seconds();

        self.resources.poll();
        self.camera.update();
        self.world
            .update(dt, &self.resources, &mut self.scene, &mut self.camera);

        let released = self.world.take_released();
        if !released.is_empty() {
            self.renderer.release(&released);
        }

        self.scene.update_world_matrices();
        self.renderer.render(&self.scene, &self.camera.snapshot());
    }

    /// Pointer drag in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.camera.rotate(dx, dy);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.camera.zoom(steps);
    }

    pub fn select_chest(&mut self, selection: ChestSelection) {
        self.world
            .select_chest(selection, &self.resources, &mut self.scene);
    }

    pub fn open_chest(&mut self, on_done: Callback) -> bool {
        self.world
            .open_chest(&mut self.scene, &mut self.camera, on_done)
    }

    pub fn skip_cut_scene(&mut self, on_done: Callback) -> bool {
        self.world
            .skip_cut_scene(&self.scene, &mut self.camera, on_done)
    }

    pub fn reveal(&mut self, outcome: Highlight, on_done: Callback) {
        self.world.reveal(outcome, on_done);
    }

    pub fn reset_round(&mut self) {
        self.world.reset_round(&mut self.scene);
    }

    /// Releases every scene resource, the controls and the renderer, and
    /// closes both event buses. Later calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        let mut released = self.world.destroy(&mut self.scene);
        released.merge(self.scene.clear());
        self.renderer.release(&released);

        self.camera.dispose();
        self.renderer.dispose();
        self.inbound.disconnect_all();
        self.outbound.disconnect_all();
        log::info!("experience destroyed");
    }
}

#[cfg(test)]
mod tests {
    use lootchest_assets::ResourceManifest;
    use lootchest_scene::HeadlessRenderer;

    use super::*;
    use crate::music::LogAudio;

    fn experience() -> Experience<HeadlessRenderer> {
        Experience::new(
            ExperienceConfig::default(),
            Sizes::new(800, 600, 1.0),
            HeadlessRenderer::new(),
            Resources::new(ResourceManifest::new(Vec::new())),
            Box::new(LogAudio),
        )
    }

    #[test]
    fn resize_reaches_camera_and_renderer() {
        let mut experience = experience();
        experience.resize(1200, 400, 3.0);

        assert_eq!(experience.camera().camera().aspect_ratio, 3.0);
        assert_eq!(experience.renderer().size.unwrap().width, 1200);
        assert_eq!(experience.sizes().pixel_ratio, 2.0);
    }

    #[test]
    fn each_tick_renders_one_frame() {
        let mut experience = experience();
        experience.advance(Duration::from_millis(16));
        experience.advance(Duration::from_millis(16));
        assert_eq!(experience.renderer().frames, 2);
        assert_eq!(experience.time().frame(), 2);
    }

    #[test]
    fn empty_manifest_makes_the_world_ready() {
        let mut experience = experience();
        experience.advance(Duration::from_millis(16));
        assert!(experience.world().is_ready());
    }

    #[test]
    fn destroyed_experience_stops_rendering() {
        let mut experience = experience();
        let ui = experience.subscribe();
        experience.destroy();
        experience.advance(Duration::from_millis(16));

        assert!(experience.renderer().disposed);
        assert_eq!(experience.renderer().frames, 0);
        assert!(ui.is_disconnected());
        assert!(experience.camera().controls().is_disposed());
    }
}
