mod environment;
mod global_resources;
mod material;
pub mod mesh;
mod programs;
mod render;
mod texture;

pub use global_resources::SunLight;
pub use render::WgpuRenderer;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    UnsupportedSurface,
}
