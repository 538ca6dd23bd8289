use std::sync::Arc;

use glam::Mat4;

use crate::{
    error::TextureError,
    external::ExternalNode,
    material::{Material, Texture},
    mesh::Mesh,
    skeleton::Skeleton,
};

/// One converted node. `transform` already includes every ancestor.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Mat4,
    /// Shared by every node of the same load.
    pub materials: Arc<[Material]>,
    /// Shared by every node of the same load, indexed like the embedded textures.
    pub textures: Arc<[Result<Texture, TextureError>]>,
    pub meshes: Vec<Mesh>,
    pub skeleton: Skeleton,
}

impl SceneNode {
    pub fn material(&self, mesh: &Mesh) -> Option<&Material> {
        self.materials.get(mesh.material_index as usize)
    }

    pub fn has_bones(&self) -> bool {
        !self.skeleton.is_empty()
    }
}

/// Local transform of one node of the imported hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneNode {
    pub name: String,
    pub transform: Mat4,
    pub children: Vec<BoneNode>,
}

impl BoneNode {
    pub fn new(name: &str, transform: Mat4) -> Self {
        Self {
            name: name.to_string(),
            transform,
            children: vec![],
        }
    }

    pub fn from_external(node: &ExternalNode) -> Self {
        Self {
            name: node.name.clone(),
            transform: node.transformation,
            children: node.children.iter().map(BoneNode::from_external).collect(),
        }
    }

    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&BoneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}
