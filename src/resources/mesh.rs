use anyhow::Context;
use cgmath::InnerSpace;

use crate::data_structures::model::{Geometry, ModelVertex};

/**
 * Reads one glTF primitive into triangle-list geometry.
 *
 * Exporters may omit normals and indices. Missing indices are generated,
 * missing normals are calculated from the triangles so lighting still works.
 */
pub fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffer_data: &[Vec<u8>],
) -> anyhow::Result<Geometry> {
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .with_context(|| format!("Primitive {} has no POSITION attribute", primitive.index()))?
        .collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => generate_indices(positions.len()),
    };
    if let Some(out_of_range) = indices.iter().find(|i| **i as usize >= positions.len()) {
        anyhow::bail!(
            "Primitive {} references vertex {} but only has {} vertices",
            primitive.index(),
            out_of_range,
            positions.len()
        );
    }

    let mut vertices: Vec<ModelVertex> = positions
        .into_iter()
        .map(|position| ModelVertex {
            position,
            normal: [0.0; 3],
        })
        .collect();

    match reader.read_normals() {
        Some(normals) => vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal),
        None => compute_normals(&mut vertices, &indices),
    }

    Ok(Geometry { vertices, indices })
}

pub fn generate_indices(vertex_count: usize) -> Vec<u32> {
    (0..vertex_count as u32).collect()
}

/// Averages the face normals of all triangles a vertex belongs to.
pub fn compute_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];
    let mut sums = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];

    for c in indices.chunks_exact(3) {
        let pos0: cgmath::Vector3<_> = vertices[c[0] as usize].position.into();
        let pos1: cgmath::Vector3<_> = vertices[c[1] as usize].position.into();
        let pos2: cgmath::Vector3<_> = vertices[c[2] as usize].position.into();

        let face = (pos1 - pos0).cross(pos2 - pos0);
        // Degenerate triangles have no direction to contribute
        if face.magnitude2() <= f32::EPSILON {
            continue;
        }
        let face = face.normalize();
        for i in c {
            sums[*i as usize] += face;
            triangles_included[*i as usize] += 1;
        }
    }

    for (i, n) in triangles_included.into_iter().enumerate() {
        if n == 0 {
            continue;
        }
        let average = sums[i] / n as f32;
        let normal = if average.magnitude2() > f32::EPSILON {
            average.normalize()
        } else {
            average
        };
        vertices[i].normal = normal.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32) -> ModelVertex {
        ModelVertex {
            position: [x, y, z],
            normal: [0.0; 3],
        }
    }

    #[test]
    fn flat_quad_faces_the_viewer() {
        let mut vertices = vec![
            vertex(0.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.0),
            vertex(1.0, 1.0, 0.0),
            vertex(0.0, 1.0, 0.0),
        ];
        compute_normals(&mut vertices, &[0, 1, 2, 0, 2, 3]);
        for v in vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn shared_edge_averages_both_faces() {
        // Two faces folded along the x axis at a right angle.
        let mut vertices = vec![
            vertex(0.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.0),
            vertex(0.0, 1.0, 0.0),
            vertex(0.0, 0.0, 1.0),
        ];
        compute_normals(&mut vertices, &[0, 1, 2, 0, 3, 1]);

        let shared = vertices[0].normal;
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!(shared[0].abs() < 1e-6);
        assert!((shared[1] - expected).abs() < 1e-6);
        assert!((shared[2] - expected).abs() < 1e-6);
        assert_eq!(vertices[2].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[3].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn degenerate_triangles_leave_normals_untouched() {
        let mut vertices = vec![vertex(0.0, 0.0, 0.0), vertex(1.0, 0.0, 0.0), vertex(2.0, 0.0, 0.0)];
        compute_normals(&mut vertices, &[0, 1, 2]);
        assert!(vertices.iter().all(|v| v.normal == [0.0; 3]));
    }

    #[test]
    fn generated_indices_walk_vertices_in_order() {
        assert_eq!(generate_indices(6), vec![0, 1, 2, 3, 4, 5]);
        assert!(generate_indices(0).is_empty());
    }
}
