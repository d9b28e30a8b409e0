use std::collections::HashMap;

use flecs_ecs::prelude::Entity;
use glam::Vec3;
use lootchest_assets::{AssetRef, MaterialData, MeshData, TextureData, TextureFormat};
use lootchest_core::{Sizes, camera::CameraSnapshot, transform::GlobalTransform};
use lootchest_scene::{ReleasedResources, Renderer, Scene};
use uuid::Uuid;
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};

use crate::{
    RenderError,
    environment::CubeColorCache,
    global_resources::{GlobalResources, LightUniforms, SunLight},
    material::{GpuMaterial, GpuMaterialUniform, create_material_bind_group},
    mesh::{GpuGeometry, GpuMeshInstance, MeshUniform},
    programs::{DrawItem, GpuProgram, GpuProgramRenderContext, PbrProgram},
    texture::{GpuTexture, TextureHelper},
};

/// Ambient light used while the scene has no environment map.
const DEFAULT_AMBIENT: Vec3 = Vec3::splat(0.2);

const DEFAULT_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.2, // Dark Blue/Slate
    b: 0.3,
    a: 1.0,
};

struct RenderContext {
    device: Device,
    queue: Queue,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    depth_texture: wgpu::TextureView,

    default_diffuse: GpuTexture,
    default_material: GpuMaterial,

    global_resources: GlobalResources,
    pbr_program: PbrProgram,

    geometries: HashMap<Uuid, GpuGeometry>,
    materials: HashMap<Uuid, GpuMaterial>,
    textures: HashMap<Uuid, GpuTexture>,
    instances: HashMap<Entity, GpuMeshInstance>,
}

/// Forward renderer drawing every mesh of a [`Scene`] with one directional
/// light and an ambient term taken from the scene environment.
pub struct WgpuRenderer {
    context: Option<RenderContext>,
    sun: SunLight,
    ambient: CubeColorCache,
    background: CubeColorCache,
    frame: u64,
}

struct PendingDraw {
    entity: Entity,
    mesh: AssetRef<MeshData>,
    material: Option<AssetRef<MaterialData>>,
    global: GlobalTransform,
}

impl WgpuRenderer {
    /// Opens the GPU and configures `target` (usually an `Arc<Window>`).
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        sizes: &Sizes,
    ) -> Result<Self, RenderError> {
        log::info!("initializing GPU");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(target)?;

        // We use 'pollster' to block on the async adapter/device requests
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: sizes.width.max(1),
            height: sizes.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync On
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth_texture = TextureHelper::create_depth_texture(&device, &config, "Depth Texture");
        let global_resources = GlobalResources::new(&device);

        let program_context = GpuProgramRenderContext {
            device: &device,
            queue: &queue,
            format: config.format,
        };
        let pbr_program = PbrProgram::new(&program_context, &global_resources.layout);

        let default_diffuse = GpuTexture::from_image(
            &device,
            &queue,
            &TextureData {
                name: "Default White Pixel".to_string(),
                width: 1,
                height: 1,
                pixels: vec![255, 255, 255, 255],
                format: TextureFormat::Rgba8Unorm,
            },
            Some("Default White Texture"),
        );
        let default_material = create_material_bind_group(
            &device,
            &pbr_program.material_layout,
            GpuMaterialUniform::from(&MaterialData::default()),
            &default_diffuse,
        );

        log::info!("pipeline compiled, surface format {:?}", config.format);

        Ok(Self {
            context: Some(RenderContext {
                device,
                queue,
                surface,
                config,
                depth_texture,
                default_diffuse,
                default_material,
                global_resources,
                pbr_program,
                geometries: HashMap::new(),
                materials: HashMap::new(),
                textures: HashMap::new(),
                instances: HashMap::new(),
            }),
            sun: SunLight::default(),
            ambient: CubeColorCache::default(),
            background: CubeColorCache::default(),
            frame: 0,
        })
    }

    pub fn set_sun(&mut self, sun: SunLight) {
        self.sun = sun;
    }

    pub fn is_disposed(&self) -> bool {
        self.context.is_none()
    }

    /// Number of meshes currently uploaded.
    pub fn cached_geometry_count(&self) -> usize {
        self.context.as_ref().map_or(0, |ctx| ctx.geometries.len())
    }
}

impl RenderContext {
    /// Uploads whatever this frame needs that the GPU has not seen yet and
    /// writes the per-node model matrices.
    fn prepare(&mut self, draws: &[PendingDraw], frame: u64) {
        for draw in draws {
            self.geometries
                .entry(draw.mesh.id())
                .or_insert_with(|| GpuGeometry::new(&self.device, &draw.mesh.data));

            if let Some(material) = &draw.material {
                if !self.materials.contains_key(&material.id()) {
                    let diffuse = match &material.data.diffuse_texture {
                        Some(texture) => &*self.textures.entry(texture.id()).or_insert_with(|| {
                            GpuTexture::from_image(
                                &self.device,
                                &self.queue,
                                &texture.data,
                                Some(&texture.data.name),
                            )
                        }),
                        None => &self.default_diffuse,
                    };
                    let gpu_material = create_material_bind_group(
                        &self.device,
                        &self.pbr_program.material_layout,
                        GpuMaterialUniform::from(material.data.as_ref()),
                        diffuse,
                    );
                    self.materials.insert(material.id(), gpu_material);
                }
            }

            let uniform = MeshUniform::from_transform(&draw.global);
            let instance = self.instances.entry(draw.entity).or_insert_with(|| {
                GpuMeshInstance::new(&self.device, &self.pbr_program.mesh_layout, uniform)
            });
            self.queue
                .write_buffer(&instance.buffer, 0, bytemuck::cast_slice(&[uniform]));
            instance.last_frame = frame;
        }

        // Nodes that left the scene drop their uniform buffers.
        self.instances.retain(|_, instance| instance.last_frame == frame);
    }

    fn items<'a>(&'a self, draws: &[PendingDraw]) -> Vec<DrawItem<'a>> {
        draws
            .iter()
            .filter_map(|draw| {
                let material = match &draw.material {
                    Some(material) => self.materials.get(&material.id())?,
                    None => &self.default_material,
                };
                Some(DrawItem {
                    geometry: self.geometries.get(&draw.mesh.id())?,
                    material,
                    instance: self.instances.get(&draw.entity)?,
                })
            })
            .collect()
    }
}

impl Renderer for WgpuRenderer {
    fn resize(&mut self, sizes: &Sizes) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if sizes.is_empty() {
            return;
        }

        ctx.config.width = sizes.width;
        ctx.config.height = sizes.height;
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.depth_texture =
            TextureHelper::create_depth_texture(&ctx.device, &ctx.config, "Depth Texture");
    }

    fn render(&mut self, scene: &Scene, camera: &CameraSnapshot) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        self.frame += 1;

        let mut draws = Vec::new();
        scene.visit_meshes(|entity, mesh, global| {
            draws.push(PendingDraw {
                entity,
                mesh: mesh.mesh.clone(),
                material: mesh.material.clone(),
                global: *global,
            });
        });
        ctx.prepare(&draws, self.frame);

        let ambient = self
            .ambient
            .resolve(scene.environment())
            .map_or(DEFAULT_AMBIENT, |color| color * scene.environment_intensity());
        let clear = self
            .background
            .resolve(scene.background())
            .map_or(DEFAULT_CLEAR, |c| wgpu::Color {
                r: c.x as f64,
                g: c.y as f64,
                b: c.z as f64,
                a: 1.0,
            });

        ctx.global_resources
            .update_camera(&ctx.queue, camera.view_proj, camera.eye);
        ctx.global_resources
            .update_lights(&ctx.queue, LightUniforms::new(&self.sun, ambient));

        let frame = match ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.surface.configure(&ctx.device, &ctx.config);
                return;
            }
            Err(err) => {
                log::warn!("failed to acquire frame: {err}");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let items = ctx.items(&draws);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0), // Clear to "Far" (1.0)
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            ctx.pbr_program.record(
                &mut render_pass,
                (&ctx.global_resources.bind_group, items.as_slice()),
            );
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn release(&mut self, resources: &ReleasedResources) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        for id in &resources.meshes {
            ctx.geometries.remove(id);
        }
        for id in &resources.materials {
            ctx.materials.remove(id);
        }
        for id in &resources.textures {
            ctx.textures.remove(id);
        }
        log::debug!(
            "released {} meshes, {} materials, {} textures",
            resources.meshes.len(),
            resources.materials.len(),
            resources.textures.len()
        );
    }

    fn dispose(&mut self) {
        if self.context.take().is_some() {
            log::info!("renderer disposed");
        }
    }
}
