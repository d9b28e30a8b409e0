use std::mem;

use bytemuck::{Pod, Zeroable};
use lootchest_assets::MeshData;
use lootchest_core::transform::GlobalTransform;
use wgpu::util::DeviceExt;

// #[repr(C)] ensures the compiler doesn't reorder fields.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshUniform {
    // Moves the object from (0,0,0) to its place in the world.
    pub model: [[f32; 4]; 4],

    // Transpose(Inverse(Model)), 4x4 for alignment.
    pub normal_matrix: [[f32; 4]; 4],
}

impl MeshUniform {
    pub fn from_transform(global: &GlobalTransform) -> Self {
        let model_matrix = global.0;
        let normal_matrix = model_matrix.inverse().transpose();

        Self {
            model: model_matrix.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3], // X, Y, Z
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0, // @location(0) in shader
                    format: wgpu::VertexFormat::Float32x3, // position
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: (mem::size_of::<[f32; 3]>() * 2) as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuGeometry {
    pub fn new(device: &wgpu::Device, data: &MeshData) -> Self {
        let (vertex_buffer, index_buffer, index_count) = create_gpu_buffer(device, data);
        Self {
            vertex_buffer,
            index_buffer,
            index_count,
        }
    }
}

/// Per-node model matrix buffer, rewritten every frame the node is drawn.
pub struct GpuMeshInstance {
    pub bind_group: wgpu::BindGroup,
    pub buffer: wgpu::Buffer,
    pub last_frame: u64,
}

impl GpuMeshInstance {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, uniform: MeshUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            bind_group,
            buffer,
            last_frame: 0,
        }
    }
}

pub fn to_gpu_vertices(data: &MeshData) -> Vec<Vertex> {
    data.vertices
        .iter()
        .map(|v| Vertex {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        })
        .collect()
}

fn create_gpu_buffer(device: &wgpu::Device, data: &MeshData) -> (wgpu::Buffer, wgpu::Buffer, u32) {
    let vertices = to_gpu_vertices(data);

    let v_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let i_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Index Buffer"),
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    (v_buffer, i_buffer, data.indices.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(mem::size_of::<Vertex>(), 32);
        assert_eq!(Vertex::desc().array_stride, 32);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let global = GlobalTransform(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        let uniform = MeshUniform::from_transform(&global);
        assert_eq!(uniform.normal_matrix[0][0], 0.5);
        assert_eq!(uniform.model[0][0], 2.0);
    }

    #[test]
    fn cuboid_converts_to_interleaved_vertices() {
        let data = MeshData::cuboid(1.0, 1.0, 1.0);
        let vertices = to_gpu_vertices(&data);
        assert_eq!(vertices.len(), data.vertices.len());
        assert_eq!(vertices[0].normal, data.vertices[0].normal);
    }
}
