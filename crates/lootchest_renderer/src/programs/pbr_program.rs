use wgpu::RenderPipeline;

use crate::{
    material::{GpuMaterial, create_material_layout},
    mesh::{GpuGeometry, GpuMeshInstance, Vertex},
    programs::{GpuProgram, GpuProgramRenderContext},
    texture::TextureHelper,
};

/// One mesh node ready to be drawn.
pub struct DrawItem<'a> {
    pub geometry: &'a GpuGeometry,
    pub material: &'a GpuMaterial,
    pub instance: &'a GpuMeshInstance,
}

pub struct PbrProgram {
    pipeline: RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub mesh_layout: wgpu::BindGroupLayout,
}

impl GpuProgram for PbrProgram {
    type InitData = wgpu::BindGroupLayout;
    type DrawData<'a> = (
        &'a wgpu::BindGroup,  // Global (Camera/Lights) - Group 0
        &'a [DrawItem<'a>],   // The Meshes - Group 1 & 2
    );

    fn new(ctx: &GpuProgramRenderContext, global_layout: &Self::InitData) -> Self {
        let shader = ctx
            .device
            .create_shader_module(wgpu::include_wgsl!("shader.wgsl"));

        let material_bind_group_layout = create_material_layout(ctx.device);

        let mesh_bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Mesh Bind Group Layout"),
                    entries: &[
                        // --- BINDING 0: Model + Normal Matrix ---
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let render_pipeline_layout =
            ctx.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("PBR Pipeline Layout"),
                    // [0: Globals, 1: Material, 2: Mesh]
                    bind_group_layouts: &[
                        global_layout,
                        &material_bind_group_layout,
                        &mesh_bind_group_layout,
                    ],
                    push_constant_ranges: &[],
                });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                cache: None,
                label: Some("Render Pipeline"),
                layout: Some(&render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: TextureHelper::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less, // Closer pixels win
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        Self {
            pipeline,
            material_layout: material_bind_group_layout,
            mesh_layout: mesh_bind_group_layout,
        }
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        let (global_bind_group, items) = data;

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, global_bind_group, &[]);

        for item in items {
            if item.geometry.index_count == 0 {
                continue;
            }
            render_pass.set_bind_group(1, &item.material.bind_group, &[]);
            render_pass.set_bind_group(2, &item.instance.bind_group, &[]);
            render_pass.set_vertex_buffer(0, item.geometry.vertex_buffer.slice(..));
            render_pass.set_index_buffer(
                item.geometry.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..item.geometry.index_count, 0, 0..1);
        }
    }
}
