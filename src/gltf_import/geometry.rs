use std::collections::HashMap;

use glam::{Vec2, Vec3, Vec4};
use gltf::mesh::Mode;

/// Per-vertex attributes of one primitive, as read from the buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexData {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec4>>,
    /// glTF orientation, top-left origin.
    pub uvs: Vec<Vec<Vec2>>,
    pub joints: Option<Vec<[u16; 4]>>,
    pub weights: Option<Vec<[f32; 4]>>,
}

impl VertexData {
    pub fn read(prim: &gltf::Primitive, buffers: &[Vec<u8>]) -> Result<Self, String> {
        let reader = prim.reader(|b| buffers.get(b.index()).map(|bb| bb.as_slice()));
        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| format!("primitive {} has no POSITION attribute", prim.index()))?
            .map(Vec3::from)
            .collect();
        let normals = reader
            .read_normals()
            .map(|it| it.map(Vec3::from).collect());
        let tangents = reader
            .read_tangents()
            .map(|it| it.map(Vec4::from).collect());
        let mut uvs = vec![];
        while let Some(set) = reader.read_tex_coords(uvs.len() as u32) {
            uvs.push(set.into_f32().map(Vec2::from).collect());
        }
        let joints = reader.read_joints(0).map(|it| it.into_u16().collect());
        let weights = reader.read_weights(0).map(|it| it.into_f32().collect());

        Ok(Self {
            positions,
            normals,
            tangents,
            uvs,
            joints,
            weights,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    fn vertex_key(&self, i: usize) -> Vec<u32> {
        let mut key: Vec<u32> = self.positions[i].to_array().map(f32::to_bits).to_vec();
        if let Some(normals) = &self.normals {
            key.extend(normals[i].to_array().map(f32::to_bits));
        }
        if let Some(tangents) = &self.tangents {
            key.extend(tangents[i].to_array().map(f32::to_bits));
        }
        for set in &self.uvs {
            key.extend(set[i].to_array().map(f32::to_bits));
        }
        if let Some(joints) = &self.joints {
            key.extend(joints[i].map(u32::from));
        }
        if let Some(weights) = &self.weights {
            key.extend(weights[i].map(f32::to_bits));
        }
        key
    }

    fn select(&self, kept: &[usize]) -> Self {
        fn pick<T: Copy>(values: &[T], kept: &[usize]) -> Vec<T> {
            kept.iter().map(|&i| values[i]).collect()
        }
        Self {
            positions: pick(&self.positions, kept),
            normals: self.normals.as_ref().map(|v| pick(v, kept)),
            tangents: self.tangents.as_ref().map(|v| pick(v, kept)),
            uvs: self.uvs.iter().map(|set| pick(set, kept)).collect(),
            joints: self.joints.as_ref().map(|v| pick(v, kept)),
            weights: self.weights.as_ref().map(|v| pick(v, kept)),
        }
    }

    /// Checks every present channel against the position count.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.len();
        let lengths = [
            ("NORMAL", self.normals.as_ref().map(Vec::len)),
            ("TANGENT", self.tangents.as_ref().map(Vec::len)),
            ("JOINTS_0", self.joints.as_ref().map(Vec::len)),
            ("WEIGHTS_0", self.weights.as_ref().map(Vec::len)),
        ];
        for (name, len) in lengths {
            if let Some(len) = len.filter(|len| *len != n) {
                return Err(format!("{} has {} entries for {} positions", name, len, n));
            }
        }
        for (set, uvs) in self.uvs.iter().enumerate() {
            if uvs.len() != n {
                return Err(format!(
                    "TEXCOORD_{} has {} entries for {} positions",
                    set,
                    uvs.len(),
                    n
                ));
            }
        }
        Ok(())
    }
}

/// Index list of a primitive, or `0..n` when it has none.
pub fn read_indices(prim: &gltf::Primitive, buffers: &[Vec<u8>], vertex_count: usize) -> Vec<u32> {
    let reader = prim.reader(|b| buffers.get(b.index()).map(|bb| bb.as_slice()));
    match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertex_count as u32).collect(),
    }
}

/// Splits an index list into faces. Strips and fans always become triangles.
/// Points and lines are dropped (`None`) when triangulating, otherwise kept as
/// one- and two-index faces.
pub fn assemble_faces(mode: Mode, indices: &[u32], triangulate: bool) -> Option<Vec<Vec<u32>>> {
    let faces = match mode {
        Mode::Triangles => indices.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => (0..indices.len().saturating_sub(2))
            .map(|i| {
                if i % 2 == 0 {
                    vec![indices[i], indices[i + 1], indices[i + 2]]
                } else {
                    vec![indices[i + 1], indices[i], indices[i + 2]]
                }
            })
            .collect(),
        Mode::TriangleFan => (1..indices.len().saturating_sub(1))
            .map(|i| vec![indices[0], indices[i], indices[i + 1]])
            .collect(),
        _ if triangulate => return None,
        Mode::Points => indices.iter().map(|&i| vec![i]).collect(),
        Mode::Lines => indices.chunks_exact(2).map(<[u32]>::to_vec).collect(),
        Mode::LineStrip => indices.windows(2).map(<[u32]>::to_vec).collect(),
        Mode::LineLoop => {
            let mut faces: Vec<Vec<u32>> = indices.windows(2).map(<[u32]>::to_vec).collect();
            if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                if indices.len() > 2 {
                    faces.push(vec![last, first]);
                }
            }
            faces
        }
    };
    Some(faces)
}

/// Merges vertices whose attributes are bit-identical and rewrites `faces`.
/// Returns the merged data and, for every old vertex, its new index.
pub fn join_identical_vertices(data: &VertexData, faces: &mut [Vec<u32>]) -> (VertexData, Vec<u32>) {
    let mut seen: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut kept = vec![];
    let remap: Vec<u32> = (0..data.len())
        .map(|i| {
            *seen.entry(data.vertex_key(i)).or_insert_with(|| {
                kept.push(i);
                (kept.len() - 1) as u32
            })
        })
        .collect();
    for face in faces.iter_mut() {
        for index in face.iter_mut() {
            *index = remap[*index as usize];
        }
    }
    (data.select(&kept), remap)
}
