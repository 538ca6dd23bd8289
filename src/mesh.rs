use glam::{Vec2, Vec3};

use crate::{
    bone::{Bone, BoneId},
    error::ImportError,
    external::ExternalMesh,
    skeleton::Skeleton,
};

/// Triangle mesh with per-vertex channels. Optional channels are either
/// empty or have one entry per position.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub material_index: u32,
    /// Three per triangle.
    pub indices: Vec<u32>,
    pub positions: Vec<Vec3>,
    /// Top-left origin.
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    /// Bones live in the owning node's skeleton and may be shared with other meshes.
    pub bones: Vec<BoneId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Aabb { min: *first, max: *first };
        for point in rest {
            aabb.min = aabb.min.min(*point);
            aabb.max = aabb.max.max(*point);
        }
        Some(aabb)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Up to four influences per vertex, joint indices in [`crate::skeleton::BoneData`] order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinBuffers {
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    /// Packs the four strongest influences of every vertex, weights normalized.
    /// Vertices without influences get all-zero weights.
    pub fn skin_buffers(&self, skeleton: &Skeleton) -> SkinBuffers {
        let mut influences: Vec<Vec<(u16, f32)>> = vec![vec![]; self.vertex_count()];
        for &id in &self.bones {
            let joint = match skeleton.bone_data() {
                Some(data) => data.joint_index(id),
                None => skeleton.joint_index(id),
            };
            let (Some(joint), Some(bone)) = (joint, skeleton.bone(id)) else {
                continue;
            };
            for weight in &bone.weights {
                if let Some(slot) = influences.get_mut(weight.vertex_id as usize) {
                    slot.push((joint as u16, weight.weight));
                }
            }
        }

        let mut buffers = SkinBuffers::default();
        for mut vertex in influences {
            vertex.sort_by(|a, b| b.1.total_cmp(&a.1));
            vertex.truncate(4);
            let total: f32 = vertex.iter().map(|(_, w)| w).sum();
            let mut joints = [0u16; 4];
            let mut weights = [0f32; 4];
            for (i, (joint, weight)) in vertex.into_iter().enumerate() {
                joints[i] = joint;
                weights[i] = if total > 0.0 { weight / total } else { 0.0 };
            }
            buffers.joints.push(joints);
            buffers.weights.push(weights);
        }
        buffers
    }
}

fn check_channel(
    mesh: &ExternalMesh,
    channel: &'static str,
    len: usize,
) -> Result<(), ImportError> {
    let vertices = mesh.vertices.len();
    if len != 0 && len != vertices {
        return Err(ImportError::ChannelLength {
            mesh: mesh.name.clone(),
            channel,
            len,
            vertices,
        });
    }
    Ok(())
}

fn check_index(mesh: &ExternalMesh, index: u32) -> Result<(), ImportError> {
    if index as usize >= mesh.vertices.len() {
        return Err(ImportError::IndexOutOfRange {
            mesh: mesh.name.clone(),
            index,
            vertices: mesh.vertices.len(),
        });
    }
    Ok(())
}

/// Converts one external mesh and stores its bones into `skeleton`.
pub fn read_mesh(mesh: &ExternalMesh, skeleton: &mut Skeleton) -> Result<Mesh, ImportError> {
    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    for face in &mesh.faces {
        if face.len() != 3 {
            return Err(ImportError::NonTriangularFace {
                mesh: mesh.name.clone(),
                count: face.len(),
            });
        }
        for &index in face {
            check_index(mesh, index)?;
            indices.push(index);
        }
    }

    // only the first channel is read
    let uvs: Vec<Vec2> = mesh
        .texture_coords
        .first()
        .map(|channel| channel.iter().map(|uv| Vec2::new(uv.x, 1.0 - uv.y)).collect())
        .unwrap_or_default();
    let normals = mesh.normals.clone().unwrap_or_default();
    let tangents = mesh.tangents.clone().unwrap_or_default();
    let bitangents = mesh.bitangents.clone().unwrap_or_default();

    check_channel(mesh, "uv", uvs.len())?;
    check_channel(mesh, "normal", normals.len())?;
    check_channel(mesh, "tangent", tangents.len())?;
    check_channel(mesh, "bitangent", bitangents.len())?;

    let mut bones = Vec::with_capacity(mesh.bones.len());
    for bone in &mesh.bones {
        for &(vertex_id, _) in &bone.weights {
            check_index(mesh, vertex_id)?;
        }
        bones.push(Bone::from_external(bone));
    }
    let bones = skeleton.store(bones);

    Ok(Mesh {
        name: mesh.name.clone(),
        material_index: mesh.material_index,
        indices,
        positions: mesh.vertices.clone(),
        uvs,
        normals,
        tangents,
        bitangents,
        bones,
    })
}
