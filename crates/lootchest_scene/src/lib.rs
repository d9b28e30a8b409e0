use std::collections::BTreeSet;
use std::sync::Arc;

use flecs_ecs::prelude::*;
use glam::{Mat4, Vec3};
use lootchest_assets::{AssetRef, CubeTextureData, MaterialData, MeshData, ModelData};
use lootchest_core::transform::{GlobalTransform, Transform};
use uuid::Uuid;

pub mod animation;
pub mod renderer;
pub mod tween;

pub use animation::{ActionId, AnimationAction, AnimationMixer, LoopMode, MixerEvent};
pub use renderer::{HeadlessRenderer, Renderer};
pub use tween::{Ease, Timeline, TimelineEvent, TweenLeg};

#[derive(Component, Clone, Debug)]
pub struct NodeName(pub String);

#[derive(Component, Clone, Debug, Default)]
pub struct NodeChildren(pub Vec<Entity>);

#[derive(Component, Clone, Copy, Debug)]
pub struct NodeParent(pub Entity);

#[derive(Component, Clone, Debug)]
pub struct MeshInstance {
    pub mesh: AssetRef<MeshData>,
    pub material: Option<AssetRef<MaterialData>>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshInstance {
    pub fn new(mesh: AssetRef<MeshData>, material: Option<AssetRef<MaterialData>>) -> Self {
        Self {
            mesh,
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

/// GPU-side ids a renderer may free once the nodes using them are gone.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReleasedResources {
    pub meshes: BTreeSet<Uuid>,
    pub materials: BTreeSet<Uuid>,
    pub textures: BTreeSet<Uuid>,
}

impl ReleasedResources {
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.materials.is_empty() && self.textures.is_empty()
    }

    pub fn merge(&mut self, other: ReleasedResources) {
        self.meshes.extend(other.meshes);
        self.materials.extend(other.materials);
        self.textures.extend(other.textures);
    }

    fn collect(&mut self, mesh: &MeshInstance) {
        self.meshes.insert(mesh.mesh.id());
        if let Some(material) = &mesh.material {
            self.materials.insert(material.id());
            if let Some(texture) = &material.data.diffuse_texture {
                self.textures.insert(texture.id());
            }
        }
    }
}

/// Anything owning scene nodes or GPU resources that must be released as a
/// unit when it goes away.
pub trait Disposable {
    fn dispose(&mut self, scene: &mut Scene) -> ReleasedResources;
}

/// Scene graph backed by a flecs world. All nodes hang below a single root.
pub struct Scene {
    world: World,
    root: Entity,
    environment: Option<Arc<CubeTextureData>>,
    background: Option<Arc<CubeTextureData>>,
    environment_intensity: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let world = World::new();
        let root = world
            .entity()
            .set(NodeName("Scene".to_string()))
            .set(Transform::default())
            .set(GlobalTransform::default())
            .set(NodeChildren::default())
            .id();

        Self {
            world,
            root,
            environment: None,
            background: None,
            environment_intensity: 1.0,
        }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.is_alive(entity)
    }

    /// Adds an empty group node under `parent` (or the root).
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        let entity = self
            .world
            .entity()
            .set(NodeName(name.into()))
            .set(transform)
            .set(GlobalTransform::default())
            .set(NodeChildren::default())
            .id();
        self.attach(entity, parent.unwrap_or(self.root));
        entity
    }

    pub fn spawn_mesh(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<Entity>,
        mesh: MeshInstance,
    ) -> Entity {
        let entity = self.spawn(name, transform, parent);
        self.world.entity_from_id(entity).set(mesh);
        entity
    }

    /// Instantiates `model` under a new group node called `name`. Nodes with a
    /// single primitive carry it directly; nodes with several get one child
    /// mesh per primitive.
    pub fn spawn_model(&mut self, model: &ModelData, name: &str, parent: Option<Entity>) -> Entity {
        let group = self.spawn(name, Transform::default(), parent);

        let mut stack: Vec<(usize, Entity)> = model.roots.iter().rev().map(|&i| (i, group)).collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(node) = model.nodes.get(index) else {
                log::warn!("model '{name}' references missing node {index}");
                continue;
            };
            let entity = self.spawn(node.name.clone(), node.transform, Some(parent));

            let primitives: Vec<_> = node
                .primitives
                .iter()
                .filter_map(|&p| model.primitives.get(p))
                .collect();
            match primitives.as_slice() {
                [] => {}
                [single] => {
                    let mesh = MeshInstance::new(single.mesh.clone(), single.material.clone());
                    self.world.entity_from_id(entity).set(mesh);
                }
                many => {
                    for (i, primitive) in many.iter().enumerate() {
                        let mesh = MeshInstance::new(primitive.mesh.clone(), primitive.material.clone());
                        self.spawn_mesh(format!("{}_{i}", node.name), Transform::default(), Some(entity), mesh);
                    }
                }
            }

            stack.extend(node.children.iter().rev().map(|&c| (c, entity)));
        }

        self.update_world_matrices();
        group
    }

    fn attach(&mut self, child: Entity, parent: Entity) {
        let parent_view = self.world.entity_from_id(parent);
        parent_view.try_get::<&mut NodeChildren>(|children| children.0.push(child));
        self.world.entity_from_id(child).set(NodeParent(parent));
    }

    fn detach(&mut self, child: Entity) {
        let parent = self.parent(child);
        if let Some(parent) = parent {
            self.world
                .entity_from_id(parent)
                .try_get::<&mut NodeChildren>(|children| children.0.retain(|&c| c != child));
        }
    }

    pub fn name(&self, entity: Entity) -> Option<String> {
        if !self.contains(entity) {
            return None;
        }
        self.world
            .entity_from_id(entity)
            .try_get::<&NodeName>(|name| name.0.clone())
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        if !self.contains(entity) {
            return None;
        }
        self.world
            .entity_from_id(entity)
            .try_get::<&NodeParent>(|parent| parent.0)
    }

    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        if !self.contains(entity) {
            return Vec::new();
        }
        self.world
            .entity_from_id(entity)
            .try_get::<&NodeChildren>(|children| children.0.clone())
            .unwrap_or_default()
    }

    /// `entity` and everything below it, depth first, parents before children.
    pub fn descendants(&self, entity: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        if !self.contains(entity) {
            return out;
        }
        let mut stack = vec![entity];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    pub fn find_by_name(&self, under: Entity, name: &str) -> Option<Entity> {
        self.descendants(under)
            .into_iter()
            .find(|&e| self.name(e).as_deref() == Some(name))
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        if !self.contains(entity) {
            return None;
        }
        self.world
            .entity_from_id(entity)
            .try_get::<&Transform>(|t| *t)
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        self.with_transform(entity, |t| *t = transform)
    }

    /// Edits the local transform of `entity`. Returns `false` if it is gone.
    pub fn with_transform(&mut self, entity: Entity, f: impl FnOnce(&mut Transform)) -> bool {
        if !self.contains(entity) {
            return false;
        }
        self.world
            .entity_from_id(entity)
            .try_get::<&mut Transform>(f)
            .is_some()
    }

    pub fn global_transform(&self, entity: Entity) -> Option<GlobalTransform> {
        if !self.contains(entity) {
            return None;
        }
        self.world
            .entity_from_id(entity)
            .try_get::<&GlobalTransform>(|g| *g)
    }

    pub fn world_position(&self, entity: Entity) -> Option<Vec3> {
        self.global_transform(entity).map(|g| g.translation())
    }

    pub fn mesh(&self, entity: Entity) -> Option<MeshInstance> {
        if !self.contains(entity) {
            return None;
        }
        self.world
            .entity_from_id(entity)
            .try_get::<&MeshInstance>(|m| m.clone())
    }

    /// Mesh-carrying nodes at or below `entity`, in traversal order.
    pub fn meshes_under(&self, entity: Entity) -> Vec<Entity> {
        self.descendants(entity)
            .into_iter()
            .filter(|&e| self.mesh(e).is_some())
            .collect()
    }

    pub fn set_shadows(&mut self, under: Entity, cast: bool, receive: bool) {
        for entity in self.meshes_under(under) {
            self.world
                .entity_from_id(entity)
                .try_get::<&mut MeshInstance>(|mesh| {
                    mesh.cast_shadow = cast;
                    mesh.receive_shadow = receive;
                });
        }
    }

    /// Recomputes every [`GlobalTransform`] from the root down.
    pub fn update_world_matrices(&mut self) {
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((entity, parent_matrix)) = stack.pop() {
            let view = self.world.entity_from_id(entity);
            let local = view
                .try_get::<&Transform>(|t| t.compute_matrix())
                .unwrap_or(Mat4::IDENTITY);
            let world_matrix = parent_matrix * local;
            view.try_get::<&mut GlobalTransform>(|g| g.0 = world_matrix);

            for child in self.children(entity) {
                stack.push((child, world_matrix));
            }
        }
    }

    /// Removes `entity` and its subtree, returning the GPU resources the
    /// removed meshes referenced.
    pub fn despawn_recursive(&mut self, entity: Entity) -> ReleasedResources {
        let mut released = ReleasedResources::default();
        if entity == self.root || !self.contains(entity) {
            return released;
        }

        self.detach(entity);
        for node in self.descendants(entity).into_iter().rev() {
            if let Some(mesh) = self.mesh(node) {
                released.collect(&mesh);
            }
            self.world.entity_from_id(node).destruct();
        }
        released
    }

    /// Every mesh in the graph with its world matrix, in traversal order.
    pub fn visit_meshes(&self, mut f: impl FnMut(Entity, &MeshInstance, &GlobalTransform)) {
        for entity in self.descendants(self.root) {
            let view = self.world.entity_from_id(entity);
            let global = view.try_get::<&GlobalTransform>(|g| *g).unwrap_or_default();
            view.try_get::<&MeshInstance>(|mesh| f(entity, mesh, &global));
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes_under(self.root).len()
    }

    pub fn node_count(&self) -> usize {
        self.descendants(self.root).len()
    }

    pub fn set_environment(&mut self, environment: Option<Arc<CubeTextureData>>) {
        self.environment = environment;
    }

    pub fn environment(&self) -> Option<&Arc<CubeTextureData>> {
        self.environment.as_ref()
    }

    pub fn set_background(&mut self, background: Option<Arc<CubeTextureData>>) {
        self.background = background;
    }

    pub fn background(&self) -> Option<&Arc<CubeTextureData>> {
        self.background.as_ref()
    }

    pub fn set_environment_intensity(&mut self, intensity: f32) {
        self.environment_intensity = intensity;
    }

    pub fn environment_intensity(&self) -> f32 {
        self.environment_intensity
    }
}

impl Scene {
    /// Removes every node below the root and forgets the environment.
    pub fn clear(&mut self) -> ReleasedResources {
        let mut released = ReleasedResources::default();
        for child in self.children(self.root) {
            released.merge(self.despawn_recursive(child));
        }
        self.environment = None;
        self.background = None;
        released
    }
}
