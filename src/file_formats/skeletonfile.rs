use serde::{Deserialize, Serialize};

use crate::skeleton::BoneData;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: Option<String>,
    pub children: Vec<u32>,
    /// column-major, relative to the parent joint
    pub trs: [[f32; 4]; 4],
    /// column-major
    pub inverse_bind_matrix: [[f32; 4]; 4],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub joints: Vec<Joint>,
}

impl From<&BoneData> for Skeleton {
    fn from(data: &BoneData) -> Self {
        let mut joints: Vec<Joint> = (0..data.len())
            .map(|idx| Joint {
                name: Some(data.names[idx].clone()),
                children: vec![],
                trs: data.local_rest_pose(idx).to_cols_array_2d(),
                inverse_bind_matrix: data.inverse_bind_matrices[idx].to_cols_array_2d(),
            })
            .collect();
        for (idx, parent) in data.parents.iter().enumerate() {
            if let Some(parent) = parent {
                joints[*parent].children.push(idx as u32);
            }
        }
        Skeleton { joints }
    }
}
