use std::hash::{Hash, Hasher};
use std::{cmp::Ordering, marker::PhantomData, sync::Arc};
use uuid::Uuid;

// Typed asset id. Renderers key their GPU caches on it.
#[derive(Debug)]
pub struct Handle<T> {
    pub id: Uuid,
    marker: PhantomData<T>,
}

impl<T> Handle<T> {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            marker: PhantomData,
        }
    }

    pub fn from_id(id: Uuid) -> Self {
        Self {
            id,
            marker: PhantomData,
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shared CPU-side asset together with its handle.
#[derive(Debug)]
pub struct AssetRef<T> {
    pub handle: Handle<T>,
    pub data: Arc<T>,
}

impl<T> AssetRef<T> {
    pub fn new(data: T) -> Self {
        Self {
            handle: Handle::new(),
            data: Arc::new(data),
        }
    }

    pub fn id(&self) -> Uuid {
        self.handle.id
    }
}

impl<T> Clone for AssetRef<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            data: Arc::clone(&self.data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis-aligned box centred on the origin.
    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        // (normal, tangent u, tangent v) per face
        let faces = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let half = [hx, hy, hz];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let mut position = [0.0f32; 3];
                for axis in 0..3 {
                    position[axis] = (normal[axis] + u[axis] * su + v[axis] * sv) * half[axis];
                }
                vertices.push(Vertex {
                    position,
                    normal,
                    uv: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
