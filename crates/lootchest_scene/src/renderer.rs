use lootchest_core::{Sizes, camera::CameraSnapshot};

use crate::{ReleasedResources, Scene};

/// Draws a [`Scene`] from a camera. Implementations cache GPU copies of mesh
/// and texture data keyed by asset handle.
pub trait Renderer {
    fn resize(&mut self, sizes: &Sizes);

    fn render(&mut self, scene: &Scene, camera: &CameraSnapshot);

    /// Frees cached GPU data for assets no longer in the scene.
    fn release(&mut self, resources: &ReleasedResources);

    /// Frees everything. The renderer draws nothing afterwards.
    fn dispose(&mut self);
}

/// Renderer that draws nothing and counts what it was asked to do.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    pub frames: u64,
    pub size: Option<Sizes>,
    pub last_mesh_count: usize,
    pub released: ReleasedResources,
    pub disposed: bool,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for HeadlessRenderer {
    fn resize(&mut self, sizes: &Sizes) {
        self.size = Some(*sizes);
    }

    fn render(&mut self, scene: &Scene, _camera: &CameraSnapshot) {
        if self.disposed {
            return;
        }
        self.frames += 1;
        self.last_mesh_count = scene.mesh_count();
    }

    fn release(&mut self, resources: &ReleasedResources) {
        self.released.merge(resources.clone());
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
