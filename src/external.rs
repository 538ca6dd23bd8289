//! The scene graph produced by an external importer, before conversion.
//!
//! This mirrors the generic node/mesh/material layout most import libraries
//! hand back: meshes and materials live in scene-wide arrays and nodes refer
//! to them by index, bones are listed per mesh, materials are key/value
//! property tables with named texture slots.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::{flags::ImportFlags, vfs::FileBridge};

pub const MATKEY_NAME: &str = "?mat.name";
pub const MATKEY_COLOR_DIFFUSE: &str = "$clr.diffuse";
pub const MATKEY_METALLIC_FACTOR: &str = "$mat.metallicFactor";
pub const MATKEY_ROUGHNESS_FACTOR: &str = "$mat.roughnessFactor";
pub const MATKEY_TWOSIDED: &str = "$mat.twosided";

/// Prefix of texture references that point into [`ExternalScene::textures`].
pub const EMBEDDED_TEXTURE_PREFIX: char = '*';

/// Produces an [`ExternalScene`] from a named asset.
pub trait SceneImporter {
    /// Returns the library's error message when no scene could be produced.
    fn import(&self, name: &str, flags: ImportFlags, io: &FileBridge) -> Result<ExternalScene, String>;
}

#[derive(Debug, Clone, Default)]
pub struct ExternalScene {
    pub root: ExternalNode,
    pub meshes: Vec<ExternalMesh>,
    pub materials: Vec<ExternalMaterial>,
    pub textures: Vec<EmbeddedTexture>,
    pub animations: Vec<ExternalAnimation>,
}

#[derive(Debug, Clone)]
pub struct ExternalNode {
    pub name: String,
    pub transformation: Mat4,
    /// Indices into [`ExternalScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<ExternalNode>,
}

impl Default for ExternalNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            transformation: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl ExternalNode {
    pub fn new(name: &str, transformation: Mat4) -> Self {
        Self {
            name: name.to_string(),
            transformation,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExternalMesh {
    pub name: String,
    pub material_index: u32,
    pub faces: Vec<Vec<u32>>,
    pub vertices: Vec<Vec3>,
    /// One entry per UV channel, each either empty or one entry per vertex.
    pub texture_coords: Vec<Vec<Vec2>>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
    pub bones: Vec<ExternalBone>,
}

#[derive(Debug, Clone)]
pub struct ExternalBone {
    pub name: String,
    /// Mesh space to bone space in bind pose.
    pub offset_matrix: Mat4,
    /// `(vertex id, weight)` pairs.
    pub weights: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Float(Vec<f32>),
    Integer(Vec<i32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProperty {
    pub key: String,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Diffuse,
    Normals,
    MetallicRoughness,
    Emissive,
    Occlusion,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalMaterial {
    pub properties: Vec<MaterialProperty>,
    pub textures: Vec<(TextureType, String)>,
}

impl ExternalMaterial {
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        // later entries override earlier ones
        self.properties
            .iter()
            .rev()
            .find(|property| property.key == key)
            .map(|property| &property.value)
    }

    pub fn float(&self, key: &str) -> Option<f32> {
        match self.property(key)? {
            PropertyValue::Float(values) => values.first().copied(),
            PropertyValue::Integer(values) => values.first().map(|v| *v as f32),
            PropertyValue::String(_) => None,
        }
    }

    pub fn color(&self, key: &str) -> Option<Vec4> {
        match self.property(key)? {
            PropertyValue::Float(values) if values.len() >= 4 => {
                Some(Vec4::new(values[0], values[1], values[2], values[3]))
            }
            PropertyValue::Float(values) if values.len() == 3 => {
                Some(Vec4::new(values[0], values[1], values[2], 1.0))
            }
            _ => None,
        }
    }

    /// The `index`th texture path bound to `slot`.
    pub fn texture(&self, slot: TextureType, index: usize) -> Option<&str> {
        self.textures
            .iter()
            .filter(|(ty, _)| *ty == slot)
            .nth(index)
            .map(|(_, path)| path.as_str())
    }
}

/// A compressed image blob shipped inside the asset.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedTexture {
    /// File extension style hint such as `png` or `jpg`, may be empty.
    pub format_hint: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalAnimation {
    pub name: String,
    /// In ticks.
    pub duration: f64,
    pub ticks_per_second: f64,
    pub channels: Vec<ExternalNodeAnim>,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalNodeAnim {
    pub node_name: String,
    pub position_keys: Vec<(f64, Vec3)>,
    pub rotation_keys: Vec<(f64, Quat)>,
    pub scaling_keys: Vec<(f64, Vec3)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_texture_slot_lookup() {
        let material = ExternalMaterial {
            properties: vec![],
            textures: vec![
                (TextureType::Normals, "normal.png".to_string()),
                (TextureType::Diffuse, "*0".to_string()),
                (TextureType::Diffuse, "*1".to_string()),
            ],
        };
        assert_eq!(material.texture(TextureType::Diffuse, 0), Some("*0"));
        assert_eq!(material.texture(TextureType::Diffuse, 1), Some("*1"));
        assert_eq!(material.texture(TextureType::Normals, 0), Some("normal.png"));
        assert_eq!(material.texture(TextureType::Emissive, 0), None);
    }

    #[test]
    fn test_material_property_values() {
        let material = ExternalMaterial {
            properties: vec![
                MaterialProperty {
                    key: MATKEY_COLOR_DIFFUSE.to_string(),
                    value: PropertyValue::Float(vec![0.5, 0.25, 1.0]),
                },
                MaterialProperty {
                    key: MATKEY_TWOSIDED.to_string(),
                    value: PropertyValue::Integer(vec![1]),
                },
            ],
            textures: vec![],
        };
        assert_eq!(
            material.color(MATKEY_COLOR_DIFFUSE),
            Some(Vec4::new(0.5, 0.25, 1.0, 1.0))
        );
        assert_eq!(material.float(MATKEY_TWOSIDED), Some(1.0));
        assert_eq!(material.float(MATKEY_NAME), None);
    }
}
