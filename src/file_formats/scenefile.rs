use serde::{Deserialize, Serialize};

use crate::{material, mesh};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl From<mesh::Aabb> for Aabb {
    fn from(aabb: mesh::Aabb) -> Self {
        Self {
            min: aabb.min.to_array(),
            max: aabb.max.to_array(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub material: u32,
    pub index_byte_offset: u32,
    pub index_byte_length: u32,
    /// positions only, `[f32; 3]` per vertex
    pub vertex_byte_offset: u32,
    pub vertex_byte_length: u32,
    pub vertex_count: u32,
    pub has_uvs: bool,
    pub has_normals: bool,
    pub has_tangents: bool,
    pub bones: Vec<String>,
    pub aabb: Option<Aabb>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    /// column-major, ancestors included
    pub transform: [[f32; 4]; 4],
    pub meshes: Vec<Mesh>,
    pub skeleton: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// `*<n>` for embedded textures, otherwise a path relative to the asset
    pub diffuse_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub metallic_roughness_texture: Option<String>,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub double_sided: bool,
}

impl From<&material::Material> for Material {
    fn from(material: &material::Material) -> Self {
        Self {
            name: material.name.clone(),
            diffuse_texture: material.diffuse_texture.as_ref().map(ToString::to_string),
            normal_texture: material.normal_texture.as_ref().map(ToString::to_string),
            metallic_roughness_texture: material
                .metallic_roughness_texture
                .as_ref()
                .map(ToString::to_string),
            base_color_factor: material.base_color.to_array(),
            metallic_factor: material.metallic,
            roughness_factor: material.roughness,
            double_sided: material.two_sided,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub duration: f64,
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scene {
    pub buffer: String,
    /// vertex data starts right after all index data
    pub vertex_buffer_start_offset: u32,
    pub nodes: Vec<Node>,
    pub materials: Vec<Material>,
    /// decoded texture file per embedded texture, `None` when decoding failed
    pub textures: Vec<Option<String>>,
    pub animations: Vec<Animation>,
    pub aabb: Option<Aabb>,
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::material::TextureRef;

    #[test]
    fn test_material_manifest() {
        let material = material::Material {
            name: "metal".to_string(),
            diffuse_texture: Some(TextureRef::Embedded(2)),
            normal_texture: Some(TextureRef::External("n.png".to_string())),
            metallic_roughness_texture: None,
            base_color: Vec4::ONE,
            metallic: 1.0,
            roughness: 0.5,
            two_sided: false,
        };
        let manifest = Material::from(&material);
        assert_eq!(manifest.diffuse_texture.as_deref(), Some("*2"));
        assert_eq!(manifest.normal_texture.as_deref(), Some("n.png"));
        assert_eq!(manifest.base_color_factor, [1.0; 4]);
    }
}
