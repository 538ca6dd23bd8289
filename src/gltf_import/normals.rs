use glam::Vec3;

/// One normal per triangle, written to each of its corners. Degenerate
/// triangles get +Y. Indices must already be in range.
pub fn generate_flat_normals(positions: &[Vec3], indices: &[u32]) -> Result<Vec<Vec3>, String> {
    if indices.len() % 3 != 0 {
        return Err("index buffer length must be a multiple of 3 (triangles)".to_string());
    }

    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);

        let cross = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        let normal = if cross.length_squared() < f32::EPSILON {
            Vec3::Y
        } else {
            cross.normalize()
        };

        normals[i0] = normal;
        normals[i1] = normal;
        normals[i2] = normal;
    }

    Ok(normals)
}
