use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4], // View-Projection matrix
    pub eye: [f32; 4],            // .w = padding
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniforms {
    pub sun_direction: [f32; 4], // .w = intensity
    pub sun_color: [f32; 4],     // .w = padding
    pub ambient: [f32; 4],       // .w = padding
}

/// The single directional light of the scene.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SunLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for SunLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.3),
            color: Vec3::ONE,
            intensity: 2.0,
        }
    }
}

impl LightUniforms {
    pub fn new(sun: &SunLight, ambient: Vec3) -> Self {
        let direction = sun.direction.normalize_or(Vec3::NEG_Y);
        Self {
            sun_direction: direction.extend(sun.intensity).to_array(),
            sun_color: sun.color.extend(0.0).to_array(),
            ambient: ambient.extend(0.0).to_array(),
        }
    }
}

pub struct GlobalResources {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    cam_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
}

impl GlobalResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[
                // --- BINDING 0: Camera ---
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // --- BINDING 1: Light Uniforms ---
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let initial_camera_data = CameraUniform {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            eye: [0.0; 4],
        };

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[initial_camera_data]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let initial_light_data = LightUniforms::new(&SunLight::default(), Vec3::splat(0.2));

        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Data Buffer (Lights)"),
            contents: bytemuck::cast_slice(&[initial_light_data]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &global_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            layout: global_layout,
            bind_group: global_bind_group,
            cam_buffer: camera_buffer,
            lights_buffer,
        }
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, view_proj: Mat4, eye: Vec3) {
        let uniform = CameraUniform {
            view_proj: view_proj.to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
        };
        queue.write_buffer(&self.cam_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn update_lights(&self, queue: &wgpu::Queue, uniform: LightUniforms) {
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}
