use crate::assets::AssetRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
}

#[derive(Clone, Debug)]
pub struct TextureData {
    pub name: String,
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureData {
    /// 1x1 texture of a single RGBA colour.
    pub fn solid(name: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            name: name.into(),
            pixels: rgba.to_vec(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8UnormSrgb,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Six faces in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Clone, Debug)]
pub struct CubeTextureData {
    pub faces: [TextureData; 6],
}

impl CubeTextureData {
    pub fn face_size(&self) -> (u32, u32) {
        (self.faces[0].width, self.faces[0].height)
    }
}

#[derive(Clone, Debug)]
pub struct MaterialSettings {
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub metallic: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            roughness: 0.5,
            metallic: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MaterialData {
    pub name: String,
    pub settings: MaterialSettings,
    pub diffuse_texture: Option<AssetRef<TextureData>>,
    /// Scales the scene environment contribution on this material.
    pub env_map_intensity: f32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self::new("", MaterialSettings::default())
    }
}

impl MaterialData {
    pub fn new(name: impl Into<String>, settings: MaterialSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            diffuse_texture: None,
            env_map_intensity: 1.0,
        }
    }
}
