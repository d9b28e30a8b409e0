use lootchest_assets::{MaterialData, MaterialSettings};
use wgpu::util::DeviceExt;

use crate::texture::GpuTexture;

pub struct GpuMaterial {
    pub bind_group: wgpu::BindGroup,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuMaterialUniform {
    pub base_color: [f32; 4], // 16 bytes
    pub roughness: f32,       // 4 bytes
    pub metallic: f32,        // 4 bytes
    pub env_intensity: f32,   // 4 bytes
    pub _padding: f32,        // 4 bytes (Total: 32 bytes, aligned to 16)
}

impl GpuMaterialUniform {
    pub fn new(settings: &MaterialSettings, env_intensity: f32) -> Self {
        Self {
            base_color: settings.base_color,
            roughness: settings.roughness,
            metallic: settings.metallic,
            env_intensity,
            _padding: 0.0,
        }
    }
}

impl From<&MaterialData> for GpuMaterialUniform {
    fn from(data: &MaterialData) -> Self {
        Self::new(&data.settings, data.env_map_intensity)
    }
}

pub fn create_material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material Bind Group Layout"),
        entries: &[
            // --- BINDING 0: Material Settings (Uniform Buffer) ---
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // --- BINDING 1: Diffuse Texture ---
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            // --- BINDING 2: Sampler ---
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: GpuMaterialUniform,
    diffuse: &GpuTexture,
) -> GpuMaterial {
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material Uniforms"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&diffuse.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
            },
        ],
    });

    GpuMaterial { bind_group }
}
