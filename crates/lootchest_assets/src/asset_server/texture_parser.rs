use std::path::{Path, PathBuf};

use crate::AssetError;
use crate::material::{CubeTextureData, TextureData, TextureFormat};

pub fn parse_texture(path: &Path) -> Result<TextureData, AssetError> {
    let img = image::open(path).map_err(|source| AssetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let img = img.to_rgba8();

    Ok(TextureData {
        name: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        width: img.width(),
        height: img.height(),
        pixels: img.into_raw(),
        format: TextureFormat::Rgba8UnormSrgb,
    })
}

/// Loads six face images. All faces must share one size.
pub fn parse_cube_texture(paths: &[PathBuf]) -> Result<CubeTextureData, AssetError> {
    let faces = paths
        .iter()
        .map(|p| parse_texture(p))
        .collect::<Result<Vec<_>, _>>()?;

    let faces: [TextureData; 6] = faces.try_into().map_err(|v: Vec<TextureData>| {
        AssetError::Malformed {
            path: paths.first().cloned().unwrap_or_default(),
            reason: format!("expected 6 cube faces, got {}", v.len()),
        }
    })?;

    let (width, height) = (faces[0].width, faces[0].height);
    if let Some(odd) = faces.iter().position(|f| f.width != width || f.height != height) {
        return Err(AssetError::Malformed {
            path: paths[odd].clone(),
            reason: format!("cube face is not {width}x{height}"),
        });
    }
    Ok(CubeTextureData { faces })
}
