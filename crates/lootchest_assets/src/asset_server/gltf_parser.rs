use std::path::Path;
use std::sync::Arc;

use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::image::Format;
use lootchest_core::transform::Transform;

use crate::AssetError;
use crate::animation::{AnimationClip, Channel, ChannelOutputs, Interpolation};
use crate::assets::{AssetRef, MeshData, Vertex};
use crate::material::{MaterialData, MaterialSettings, TextureData, TextureFormat};
use crate::model::{ModelData, ModelNode, ModelPrimitive};

/// Name used for a node in both the hierarchy and animation targets.
fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

pub fn parse_gltf(path: &Path) -> Result<ModelData, AssetError> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |reason: &str| AssetError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    // --- textures ---
    // gltf::import already decoded every image; only the pixel layout differs.
    let textures: Vec<Option<AssetRef<TextureData>>> = images
        .into_iter()
        .enumerate()
        .map(|(index, image)| {
            let pixels = match image.format {
                Format::R8G8B8A8 => image.pixels,
                Format::R8G8B8 => image
                    .pixels
                    .chunks_exact(3)
                    .flat_map(|c| [c[0], c[1], c[2], 255])
                    .collect(),
                Format::R8G8 => image
                    .pixels
                    .chunks_exact(2)
                    .flat_map(|c| [c[0], c[0], c[0], c[1]])
                    .collect(),
                Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
                other => {
                    log::warn!("{}: image {index} has unsupported format {other:?}", path.display());
                    return None;
                }
            };
            Some(AssetRef::new(TextureData {
                name: format!("image{index}"),
                pixels,
                width: image.width,
                height: image.height,
                format: TextureFormat::Rgba8UnormSrgb,
            }))
        })
        .collect();

    // --- materials ---
    let materials: Vec<AssetRef<MaterialData>> = document
        .materials()
        .map(|mat| {
            let pbr = mat.pbr_metallic_roughness();
            let diffuse_texture = pbr
                .base_color_texture()
                .and_then(|info| textures.get(info.texture().source().index()).cloned())
                .flatten();

            AssetRef::new(MaterialData {
                name: mat.name().unwrap_or("Material").to_string(),
                settings: MaterialSettings {
                    base_color: pbr.base_color_factor(),
                    roughness: pbr.roughness_factor(),
                    metallic: pbr.metallic_factor(),
                },
                diffuse_texture,
                env_map_intensity: 1.0,
            })
        })
        .collect();

    // --- meshes ---
    // Every glTF primitive becomes its own mesh object.
    let mut primitives = Vec::new();
    let mut mesh_primitives: Vec<Vec<usize>> = Vec::new();

    for mesh in document.meshes() {
        let mut indices_of_mesh = Vec::new();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .ok_or_else(|| malformed("mesh missing positions"))?;

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|read| read.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|read| read.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, &position)| Vertex {
                    position,
                    normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                })
                .collect();

            let material = primitive
                .material()
                .index()
                .and_then(|i| materials.get(i).cloned());

            indices_of_mesh.push(primitives.len());
            primitives.push(ModelPrimitive {
                mesh: AssetRef::new(MeshData { vertices, indices }),
                material,
            });
        }
        mesh_primitives.push(indices_of_mesh);
    }

    // --- nodes ---
    let nodes = document
        .nodes()
        .map(|node| {
            let (t, r, s) = node.transform().decomposed();
            ModelNode {
                name: node_name(&node),
                transform: Transform {
                    translation: t.into(),
                    rotation: Quat::from_array(r),
                    scale: s.into(),
                },
                primitives: node
                    .mesh()
                    .and_then(|m| mesh_primitives.get(m.index()).cloned())
                    .unwrap_or_default(),
                children: node.children().map(|c| c.index()).collect(),
            }
        })
        .collect::<Vec<_>>();

    let roots = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => {
            let mut is_child = vec![false; nodes.len()];
            for node in &nodes {
                for &child in &node.children {
                    is_child[child] = true;
                }
            }
            (0..nodes.len()).filter(|&i| !is_child[i]).collect()
        }
    };

    // --- animations ---
    let animations = document
        .animations()
        .map(|animation| {
            let channels = animation
                .channels()
                .filter_map(|channel| {
                    let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
                    let times: Vec<f32> = reader.read_inputs()?.collect();
                    let outputs = match reader.read_outputs()? {
                        ReadOutputs::Translations(it) => {
                            ChannelOutputs::Translations(it.map(Vec3::from).collect())
                        }
                        ReadOutputs::Rotations(it) => {
                            ChannelOutputs::Rotations(it.into_f32().map(Quat::from_array).collect())
                        }
                        ReadOutputs::Scales(it) => {
                            ChannelOutputs::Scales(it.map(Vec3::from).collect())
                        }
                        ReadOutputs::MorphTargetWeights(_) => return None,
                    };
                    let (outputs, interpolation) = match channel.sampler().interpolation() {
                        gltf::animation::Interpolation::Linear => (outputs, Interpolation::Linear),
                        gltf::animation::Interpolation::Step => (outputs, Interpolation::Step),
                        // Keep the keyframe values and drop the tangents.
                        gltf::animation::Interpolation::CubicSpline => {
                            (spline_values(outputs), Interpolation::Linear)
                        }
                    };
                    Some(Channel::new(
                        node_name(&channel.target().node()),
                        times,
                        outputs,
                        interpolation,
                    ))
                })
                .collect();

            let name = animation
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("animation{}", animation.index()));
            Arc::new(AnimationClip::new(name, channels))
        })
        .collect();

    log::debug!(
        "parsed {}: {} nodes, {} primitives",
        path.display(),
        nodes.len(),
        primitives.len()
    );

    Ok(ModelData {
        nodes,
        roots,
        primitives,
        animations,
    })
}

// Cubic-spline tracks store [in-tangent, value, out-tangent] per keyframe.
fn spline_values(outputs: ChannelOutputs) -> ChannelOutputs {
    fn middle<T: Copy>(v: Vec<T>) -> Vec<T> {
        v.chunks_exact(3).map(|c| c[1]).collect()
    }
    match outputs {
        ChannelOutputs::Translations(v) => ChannelOutputs::Translations(middle(v)),
        ChannelOutputs::Rotations(v) => ChannelOutputs::Rotations(middle(v)),
        ChannelOutputs::Scales(v) => ChannelOutputs::Scales(middle(v)),
    }
}
