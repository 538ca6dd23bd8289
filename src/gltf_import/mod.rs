//! [`SceneImporter`] backed by the `gltf` crate.
//!
//! The produced [`ExternalScene`] follows the conventions of generic import
//! libraries rather than glTF's own: a synthetic root holds the default
//! scene's nodes, every primitive is its own mesh, UVs have a bottom-left
//! origin, and materials are property tables.

use std::collections::{HashMap, HashSet};

use glam::{Mat4, Quat, Vec2, Vec3};
use gltf::animation::{util::ReadOutputs, Interpolation, Property};

use crate::{
    external::{
        EmbeddedTexture, ExternalAnimation, ExternalMaterial, ExternalMesh, ExternalNode,
        ExternalNodeAnim, ExternalScene, MaterialProperty, PropertyValue, SceneImporter,
        TextureType, EMBEDDED_TEXTURE_PREFIX, MATKEY_COLOR_DIFFUSE, MATKEY_METALLIC_FACTOR,
        MATKEY_NAME, MATKEY_ROUGHNESS_FACTOR, MATKEY_TWOSIDED,
    },
    flags::ImportFlags,
    vfs::FileBridge,
};

use self::{
    buffers::{load_buffers, read_image},
    geometry::{assemble_faces, join_identical_vertices, read_indices, VertexData},
    normals::generate_flat_normals,
    skins::read_bones,
    tangents::{generate_mesh_tangents, split_tangent},
};

mod buffers;
mod geometry;
mod normals;
mod skins;
mod tangents;

pub const ROOT_NODE_NAME: &str = "root";

#[derive(Debug, Clone, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import(&self, name: &str, flags: ImportFlags, io: &FileBridge) -> Result<ExternalScene, String> {
        let bytes = io
            .open(name)
            .map_err(|e| format!("could not open '{}': {}", name, e))?
            .read_remaining();
        let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| e.to_string())?;
        let buffers = load_buffers(&gltf.document, gltf.blob, name, io)?;

        let mut builder = SceneBuilder {
            flags,
            buffers: &buffers,
            scene: ExternalScene::default(),
            mesh_map: HashMap::new(),
            default_material: None,
            visited: HashSet::new(),
        };
        let image_refs = builder.read_images(&gltf.document, name, io)?;
        builder.read_materials(&gltf.document, &image_refs);

        let mut root = ExternalNode::new(ROOT_NODE_NAME, Mat4::IDENTITY);
        let scene = gltf
            .document
            .default_scene()
            .or_else(|| gltf.document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                root.children.push(builder.read_node(&node)?);
            }
        }
        builder.scene.root = root;
        builder.scene.animations = gltf
            .document
            .animations()
            .map(|animation| read_animation(&animation, &buffers))
            .collect();
        Ok(builder.scene)
    }
}

/// The node's name, or `node_<index>` for unnamed nodes.
pub fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()))
}

pub fn transform_to_mat4(transform: gltf::scene::Transform) -> Mat4 {
    match transform {
        gltf::scene::Transform::Matrix { matrix } => Mat4::from_cols_array_2d(&matrix),
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => Mat4::from_scale_rotation_translation(
            Vec3::from(scale),
            Quat::from_array(rotation),
            Vec3::from(translation),
        ),
    }
}

struct SceneBuilder<'b> {
    flags: ImportFlags,
    buffers: &'b [Vec<u8>],
    scene: ExternalScene,
    /// (mesh, skin) -> external mesh indices, one per primitive
    mesh_map: HashMap<(usize, Option<usize>), Vec<usize>>,
    default_material: Option<u32>,
    /// glTF node indices already converted
    visited: HashSet<usize>,
}

impl SceneBuilder<'_> {
    /// Decodes nothing. Returns the texture reference of every image.
    fn read_images(
        &mut self,
        document: &gltf::Document,
        base: &str,
        io: &FileBridge,
    ) -> Result<Vec<String>, String> {
        let mut refs = vec![];
        for image in document.images() {
            let reference = match image.source() {
                gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => uri.to_string(),
                _ => {
                    let (data, format_hint) = read_image(&image, self.buffers, base, io)?;
                    self.scene.textures.push(EmbeddedTexture { format_hint, data });
                    format!("{}{}", EMBEDDED_TEXTURE_PREFIX, self.scene.textures.len() - 1)
                }
            };
            refs.push(reference);
        }
        Ok(refs)
    }

    fn read_materials(&mut self, document: &gltf::Document, image_refs: &[String]) {
        for material in document.materials() {
            let mut properties = vec![];
            if let Some(name) = material.name() {
                properties.push(MaterialProperty {
                    key: MATKEY_NAME.to_string(),
                    value: PropertyValue::String(name.to_string()),
                });
            }
            let pbr = material.pbr_metallic_roughness();
            properties.push(MaterialProperty {
                key: MATKEY_COLOR_DIFFUSE.to_string(),
                value: PropertyValue::Float(pbr.base_color_factor().to_vec()),
            });
            properties.push(MaterialProperty {
                key: MATKEY_METALLIC_FACTOR.to_string(),
                value: PropertyValue::Float(vec![pbr.metallic_factor()]),
            });
            properties.push(MaterialProperty {
                key: MATKEY_ROUGHNESS_FACTOR.to_string(),
                value: PropertyValue::Float(vec![pbr.roughness_factor()]),
            });
            properties.push(MaterialProperty {
                key: MATKEY_TWOSIDED.to_string(),
                value: PropertyValue::Integer(vec![material.double_sided() as i32]),
            });

            let image_ref = |texture: gltf::Texture| image_refs.get(texture.source().index()).cloned();
            let slots = [
                (TextureType::Diffuse, pbr.base_color_texture().map(|i| i.texture())),
                (TextureType::Normals, material.normal_texture().map(|i| i.texture())),
                (
                    TextureType::MetallicRoughness,
                    pbr.metallic_roughness_texture().map(|i| i.texture()),
                ),
                (TextureType::Emissive, material.emissive_texture().map(|i| i.texture())),
                (TextureType::Occlusion, material.occlusion_texture().map(|i| i.texture())),
            ];
            let textures = slots
                .into_iter()
                .filter_map(|(slot, texture)| texture.and_then(&image_ref).map(|path| (slot, path)))
                .collect();

            self.scene.materials.push(ExternalMaterial { properties, textures });
        }
    }

    /// Index of the material used by primitives that have none.
    fn default_material(&mut self) -> u32 {
        if let Some(index) = self.default_material {
            return index;
        }
        let index = self.scene.materials.len() as u32;
        self.scene.materials.push(ExternalMaterial {
            properties: vec![MaterialProperty {
                key: MATKEY_NAME.to_string(),
                value: PropertyValue::String("DefaultMaterial".to_string()),
            }],
            textures: vec![],
        });
        self.default_material = Some(index);
        index
    }

    fn read_node(&mut self, node: &gltf::Node) -> Result<ExternalNode, String> {
        if !self.visited.insert(node.index()) {
            return Err(format!(
                "node {} appears more than once in the hierarchy (cycle or shared child)",
                node.index()
            ));
        }
        let mut external = ExternalNode::new(&node_name(node), transform_to_mat4(node.transform()));
        if let Some(mesh) = node.mesh() {
            external.meshes = self.read_mesh(&mesh, node.skin().as_ref())?;
        }
        for child in node.children() {
            external.children.push(self.read_node(&child)?);
        }
        Ok(external)
    }

    fn read_mesh(&mut self, mesh: &gltf::Mesh, skin: Option<&gltf::Skin>) -> Result<Vec<usize>, String> {
        let key = (mesh.index(), skin.map(|s| s.index()));
        if let Some(indices) = self.mesh_map.get(&key) {
            return Ok(indices.clone());
        }

        let base_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let multiple = mesh.primitives().len() > 1;
        let mut indices = vec![];
        for prim in mesh.primitives() {
            let name = if multiple {
                format!("{}-{}", base_name, prim.index())
            } else {
                base_name.clone()
            };
            match self.read_primitive(&prim, name, skin)? {
                Some(external) => {
                    self.scene.meshes.push(external);
                    indices.push(self.scene.meshes.len() - 1);
                }
                None => log::warn!(
                    "skipping primitive {} of mesh {}: {:?} is not a triangle topology",
                    prim.index(),
                    mesh.index(),
                    prim.mode()
                ),
            }
        }
        self.mesh_map.insert(key, indices.clone());
        Ok(indices)
    }

    fn read_primitive(
        &mut self,
        prim: &gltf::Primitive,
        name: String,
        skin: Option<&gltf::Skin>,
    ) -> Result<Option<ExternalMesh>, String> {
        let mut data = VertexData::read(prim, self.buffers)?;
        data.validate().map_err(|e| format!("mesh '{}': {}", name, e))?;
        let indices = read_indices(prim, self.buffers, data.len());
        let Some(mut faces) =
            assemble_faces(prim.mode(), &indices, self.flags.contains(ImportFlags::TRIANGULATE))
        else {
            return Ok(None);
        };
        if let Some(index) = faces.iter().flatten().find(|&&i| i as usize >= data.len()) {
            return Err(format!(
                "mesh '{}': index {} is out of range for {} vertices",
                name,
                index,
                data.len()
            ));
        }
        let triangles = faces.iter().all(|face| face.len() == 3);
        let flat: Vec<u32> = faces.iter().flatten().copied().collect();

        if triangles && data.normals.is_none() && self.flags.contains(ImportFlags::GEN_NORMALS) {
            data.normals = Some(generate_flat_normals(&data.positions, &flat)?);
        }
        if triangles && data.tangents.is_none() && self.flags.contains(ImportFlags::CALC_TANGENT_SPACE) {
            match (&data.normals, data.uvs.first()) {
                (Some(normals), Some(uvs)) => {
                    data.tangents = Some(generate_mesh_tangents(&data.positions, normals, uvs, &flat)?);
                }
                _ => log::warn!("mesh '{}': tangents need normals and texture coordinates", name),
            }
        }
        if self.flags.contains(ImportFlags::JOIN_IDENTICAL_VERTICES) {
            let (joined, _) = join_identical_vertices(&data, &mut faces);
            log::trace!("mesh '{}': joined {} vertices into {}", name, data.len(), joined.len());
            data = joined;
        }

        let bones = match skin {
            Some(skin) => read_bones(skin, self.buffers, &data)?,
            None => vec![],
        };
        let flip = !self.flags.contains(ImportFlags::FLIP_UVS);
        let texture_coords: Vec<Vec<Vec2>> = data
            .uvs
            .iter()
            .map(|set| {
                set.iter()
                    .map(|uv| if flip { Vec2::new(uv.x, 1.0 - uv.y) } else { *uv })
                    .collect()
            })
            .collect();
        let (tangents, bitangents) = match (&data.tangents, &data.normals) {
            (Some(tangents), Some(normals)) => {
                let (t, b): (Vec<Vec3>, Vec<Vec3>) = tangents
                    .iter()
                    .zip(normals)
                    .map(|(t, n)| split_tangent(*n, *t))
                    .unzip();
                (Some(t), Some(b))
            }
            (Some(tangents), None) => (Some(tangents.iter().map(|t| t.truncate()).collect()), None),
            _ => (None, None),
        };
        let material_index = match prim.material().index() {
            Some(index) => index as u32,
            None => self.default_material(),
        };

        Ok(Some(ExternalMesh {
            name,
            material_index,
            faces,
            vertices: data.positions,
            texture_coords,
            normals: data.normals,
            tangents,
            bitangents,
            bones,
        }))
    }
}

fn read_animation(animation: &gltf::Animation, buffers: &[Vec<u8>]) -> ExternalAnimation {
    let mut channels: Vec<ExternalNodeAnim> = vec![];
    let mut duration = 0f64;
    for channel in animation.channels() {
        let reader = channel.reader(|b| buffers.get(b.index()).map(|bb| bb.as_slice()));
        let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
            continue;
        };
        let times: Vec<f64> = inputs.map(f64::from).collect();
        if let Some(&last) = times.last() {
            duration = duration.max(last);
        }
        // cubic spline outputs are (in-tangent, value, out-tangent) triples
        let stride = match channel.sampler().interpolation() {
            Interpolation::CubicSpline => 3,
            _ => 1,
        };
        let keep = |i: usize| stride == 1 || i % 3 == 1;

        let target = node_name(&channel.target().node());
        let index = match channels.iter().position(|c| c.node_name == target) {
            Some(index) => index,
            None => {
                channels.push(ExternalNodeAnim {
                    node_name: target,
                    ..Default::default()
                });
                channels.len() - 1
            }
        };
        let anim = &mut channels[index];

        match (channel.target().property(), outputs) {
            (Property::Translation, ReadOutputs::Translations(values)) => {
                let values = values.enumerate().filter(|(i, _)| keep(*i)).map(|(_, v)| Vec3::from(v));
                anim.position_keys.extend(times.iter().copied().zip(values));
            }
            (Property::Rotation, ReadOutputs::Rotations(values)) => {
                let values = values
                    .into_f32()
                    .enumerate()
                    .filter(|(i, _)| keep(*i))
                    .map(|(_, v)| Quat::from_array(v));
                anim.rotation_keys.extend(times.iter().copied().zip(values));
            }
            (Property::Scale, ReadOutputs::Scales(values)) => {
                let values = values.enumerate().filter(|(i, _)| keep(*i)).map(|(_, v)| Vec3::from(v));
                anim.scaling_keys.extend(times.iter().copied().zip(values));
            }
            (property, _) => log::debug!("ignoring {:?} channel of '{}'", property, anim.node_name),
        }
    }

    ExternalAnimation {
        name: animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", animation.index())),
        duration,
        ticks_per_second: 1.0,
        channels,
    }
}
