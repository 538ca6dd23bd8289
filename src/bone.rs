use generational_arena::Index;
use glam::Mat4;

use crate::external::ExternalBone;

/// Handle to a [`Bone`] owned by a [`crate::skeleton::Skeleton`].
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub struct BoneId(pub Index);
impl Into<Index> for BoneId {
    fn into(self) -> Index {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex_id: u32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub weights: Vec<VertexWeight>,
    /// Mesh space to bone space in bind pose.
    pub inverse_bind_matrix: Mat4,
}

impl Bone {
    pub fn new(name: &str, inverse_bind_matrix: Mat4) -> Self {
        Self {
            name: name.to_string(),
            weights: vec![],
            inverse_bind_matrix,
        }
    }

    pub fn from_external(bone: &ExternalBone) -> Self {
        Self {
            name: bone.name.clone(),
            weights: bone
                .weights
                .iter()
                .map(|&(vertex_id, weight)| VertexWeight { vertex_id, weight })
                .collect(),
            inverse_bind_matrix: bone.offset_matrix,
        }
    }

    /// Bone space to mesh space in bind pose.
    pub fn bind_matrix(&self) -> Mat4 {
        self.inverse_bind_matrix.inverse()
    }
}
