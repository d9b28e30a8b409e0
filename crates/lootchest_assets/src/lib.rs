use std::path::PathBuf;

pub mod animation;
pub mod asset_server;
pub mod assets;
pub mod manifest;
pub mod material;
pub mod model;
pub mod resources;

pub use animation::{AnimationClip, Channel, ChannelOutputs, ChannelValue, Interpolation};
pub use assets::{AssetRef, Handle, MeshData, Vertex};
pub use manifest::{AssetKind, AssetPath, ManifestEntry, ResourceManifest};
pub use material::{CubeTextureData, MaterialData, MaterialSettings, TextureData, TextureFormat};
pub use model::{ModelData, ModelNode, ModelPrimitive};
pub use resources::{ResourceItem, Resources};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("failed to import glTF {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("asset '{name}' expects {expected} path(s), got {actual}")]
    PathCount {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("manifest lists '{0}' more than once")]
    DuplicateName(String),
    #[error("load worker failed: {0}")]
    Worker(String),
}
