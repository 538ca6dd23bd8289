use glam::Mat4;

use crate::external::ExternalBone;

use super::{geometry::VertexData, node_name};

/// One bone per skin joint, weighted by the primitive's `JOINTS_0`/`WEIGHTS_0`.
pub fn read_bones(
    skin: &gltf::Skin,
    buffers: &[Vec<u8>],
    data: &VertexData,
) -> Result<Vec<ExternalBone>, String> {
    let joints: Vec<gltf::Node> = skin.joints().collect();
    let reader = skin.reader(|b| buffers.get(b.index()).map(|bb| bb.as_slice()));
    let inverse_bind_matrices: Vec<Mat4> = match reader.read_inverse_bind_matrices() {
        Some(ibms) => ibms.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
        None => vec![Mat4::IDENTITY; joints.len()],
    };
    if inverse_bind_matrices.len() != joints.len() {
        return Err(format!(
            "inverseBindMatrices count ({}) does not match joint count ({}) for skin {}",
            inverse_bind_matrices.len(),
            joints.len(),
            skin.index()
        ));
    }

    let mut bones: Vec<ExternalBone> = joints
        .iter()
        .zip(inverse_bind_matrices)
        .map(|(joint, offset_matrix)| ExternalBone {
            name: node_name(joint),
            offset_matrix,
            weights: vec![],
        })
        .collect();

    if let (Some(vertex_joints), Some(vertex_weights)) = (&data.joints, &data.weights) {
        for (vertex, (joint_ids, weights)) in vertex_joints.iter().zip(vertex_weights).enumerate() {
            for (&joint, &weight) in joint_ids.iter().zip(weights) {
                if weight <= 0.0 {
                    continue;
                }
                let bone = bones.get_mut(joint as usize).ok_or_else(|| {
                    format!(
                        "vertex {} references joint {}, but skin {} has {} joints",
                        vertex,
                        joint,
                        skin.index(),
                        joints.len()
                    )
                })?;
                bone.weights.push((vertex as u32, weight));
            }
        }
    }

    Ok(bones)
}
