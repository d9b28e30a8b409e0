use std::sync::Arc;

use lootchest_core::transform::Transform;

use crate::animation::AnimationClip;
use crate::assets::{AssetRef, MeshData};
use crate::material::MaterialData;

/// One drawable piece of a model: a mesh and the material it is drawn with.
#[derive(Clone, Debug)]
pub struct ModelPrimitive {
    pub mesh: AssetRef<MeshData>,
    pub material: Option<AssetRef<MaterialData>>,
}

#[derive(Clone, Debug)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    /// Indices into [`ModelData::primitives`].
    pub primitives: Vec<usize>,
    pub children: Vec<usize>,
}

/// CPU-side scene graph of a loaded glTF file. Nodes are instantiated into a
/// live scene by the scene crate; this data stays immutable and shared.
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
    pub primitives: Vec<ModelPrimitive>,
    pub animations: Vec<Arc<AnimationClip>>,
}

impl ModelData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node, attaching it under `parent` or to the roots.
    pub fn push_node(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        parent: Option<usize>,
    ) -> usize {
        let index = self.nodes.len();
        self.nodes.push(ModelNode {
            name: name.into(),
            transform,
            primitives: Vec::new(),
            children: Vec::new(),
        });
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    /// Attaches a mesh to an existing node.
    pub fn push_primitive(
        &mut self,
        node: usize,
        mesh: MeshData,
        material: Option<MaterialData>,
    ) -> usize {
        let index = self.primitives.len();
        self.primitives.push(ModelPrimitive {
            mesh: AssetRef::new(mesh),
            material: material.map(AssetRef::new),
        });
        if let Some(node) = self.nodes.get_mut(node) {
            node.primitives.push(index);
        }
        index
    }

    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn animation(&self, name: &str) -> Option<Arc<AnimationClip>> {
        self.animations.iter().find(|clip| clip.name == name).cloned()
    }

    pub fn push_animation(&mut self, clip: AnimationClip) {
        self.animations.push(Arc::new(clip));
    }

    /// Number of mesh objects an instance of this model contains.
    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().map(|n| n.primitives.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_node_builds_hierarchy() {
        let mut model = ModelData::new();
        let root = model.push_node("root", Transform::default(), None);
        let lid = model.push_node("lid", Transform::from_xyz(0.0, 1.0, 0.0), Some(root));
        model.push_primitive(lid, MeshData::cuboid(0.5, 0.1, 0.5), None);

        assert_eq!(model.roots, vec![root]);
        assert_eq!(model.nodes[root].children, vec![lid]);
        assert_eq!(model.find_node("lid"), Some(lid));
        assert_eq!(model.mesh_count(), 1);
    }
}
