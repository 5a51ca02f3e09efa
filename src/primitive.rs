use std::collections::HashMap;

use glam::{DVec3, Vec3, dvec3, vec2};

use crate::mesh::SharedMesh;

fn midpoint(
    positions: &mut Vec<DVec3>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = (a.min(b), a.max(b));
    *cache.entry(key).or_insert_with(|| {
        let mid = ((positions[a as usize] + positions[b as usize]) / 2.0).normalize();
        positions.push(mid);
        (positions.len() - 1) as u32
    })
}

impl SharedMesh {
    /**
     * Sphere obtained by subdividing an icosahedron and projecting the new
     * vertices back onto the sphere. Each subdivision multiplies the face
     * count by four, starting from 20. Normals point radially outward.
     */
    pub fn icosphere(radius: f64, subdivisions: u32) -> SharedMesh {
        let t = (1.0 + 5.0f64.sqrt()) / 2.0;
        let mut positions: Vec<DVec3> = [
            dvec3(-1.0, t, 0.0),
            dvec3(1.0, t, 0.0),
            dvec3(-1.0, -t, 0.0),
            dvec3(1.0, -t, 0.0),
            dvec3(0.0, -1.0, t),
            dvec3(0.0, 1.0, t),
            dvec3(0.0, -1.0, -t),
            dvec3(0.0, 1.0, -t),
            dvec3(t, 0.0, -1.0),
            dvec3(t, 0.0, 1.0),
            dvec3(-t, 0.0, -1.0),
            dvec3(-t, 0.0, 1.0),
        ]
        .iter()
        .map(|p| p.normalize())
        .collect();
        #[rustfmt::skip]
        let mut triangles: Vec<u32> = vec![
            0, 11, 5,   0, 5, 1,    0, 1, 7,    0, 7, 10,   0, 10, 11,
            1, 5, 9,    5, 11, 4,   11, 10, 2,  10, 7, 6,   7, 1, 8,
            3, 9, 4,    3, 4, 2,    3, 2, 6,    3, 6, 8,    3, 8, 9,
            4, 9, 5,    2, 4, 11,   6, 2, 10,   8, 6, 7,    9, 8, 1,
        ];
        for _ in 0..subdivisions {
            let mut cache = HashMap::new();
            let mut next = Vec::with_capacity(triangles.len() * 4);
            for tri in triangles.chunks_exact(3) {
                let ab = midpoint(&mut positions, &mut cache, tri[0], tri[1]);
                let bc = midpoint(&mut positions, &mut cache, tri[1], tri[2]);
                let ca = midpoint(&mut positions, &mut cache, tri[2], tri[0]);
                #[rustfmt::skip]
                next.extend_from_slice(&[
                    tri[0], ab, ca,
                    tri[1], bc, ab,
                    tri[2], ca, bc,
                    ab, bc, ca,
                ]);
            }
            triangles = next;
        }
        let normals: Vec<Vec3> = positions.iter().map(|p| p.as_vec3()).collect();
        let uvs = normals
            .iter()
            .map(|n| {
                vec2(
                    0.5 + n.z.atan2(n.x) / (2.0 * std::f32::consts::PI),
                    0.5 - n.y.asin() / std::f32::consts::PI,
                )
            })
            .collect();
        SharedMesh {
            positions: positions.iter().map(|p| *p * radius).collect(),
            normals: Some(normals),
            uvs: Some(uvs),
            triangles,
        }
    }

    /**
     * Rectangular grid in the xy plane spanning `[0, width] x [0, height]`,
     * with `segments` cells per side, facing +z.
     */
    pub fn plane(width: f64, height: f64, segments: u32) -> SharedMesh {
        // A grid needs at least one cell; zero would divide by zero below.
        let segments = segments.max(1);
        let n = segments + 1;
        let mut positions = Vec::with_capacity((n * n) as usize);
        let mut uvs = Vec::with_capacity((n * n) as usize);
        for j in 0..n {
            for i in 0..n {
                let u = f64::from(i) / f64::from(segments);
                let v = f64::from(j) / f64::from(segments);
                positions.push(dvec3(width * u, height * v, 0.0));
                uvs.push(vec2(u as f32, v as f32));
            }
        }
        let mut triangles = Vec::with_capacity((segments * segments * 6) as usize);
        for j in 0..segments {
            for i in 0..segments {
                let v00 = j * n + i;
                let v10 = v00 + 1;
                let v01 = v00 + n;
                let v11 = v01 + 1;
                triangles.extend_from_slice(&[v00, v10, v01, v10, v11, v01]);
            }
        }
        SharedMesh {
            positions,
            normals: Some(vec![Vec3::Z; (n * n) as usize]),
            uvs: Some(uvs),
            triangles,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::mesh::SharedMesh;

    #[test]
    fn t_icosphere_counts() {
        for (subdivisions, faces, vertices) in [(0u32, 20, 12), (1, 80, 42), (2, 320, 162)] {
            let sphere = SharedMesh::icosphere(1.0, subdivisions);
            assert!(sphere.check_lengths().is_ok());
            assert_eq!(sphere.num_triangles(), faces);
            assert_eq!(sphere.positions.len(), vertices);
        }
    }

    #[test]
    fn t_icosphere_vertices_on_sphere() {
        let sphere = SharedMesh::icosphere(2.5, 2);
        for p in &sphere.positions {
            assert!((p.length() - 2.5).abs() < 1e-12);
        }
        for n in sphere.normals.as_ref().expect("missing normals") {
            assert!((n.length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn t_plane_counts_and_extent() {
        let plane = SharedMesh::plane(3.0, 2.0, 4);
        assert!(plane.check_lengths().is_ok());
        assert_eq!(plane.positions.len(), 25);
        assert_eq!(plane.num_triangles(), 32);
        let max_x = plane.positions.iter().map(|p| p.x).fold(0.0, f64::max);
        let max_y = plane.positions.iter().map(|p| p.y).fold(0.0, f64::max);
        assert_eq!(max_x, 3.0);
        assert_eq!(max_y, 2.0);
    }

    #[test]
    fn t_plane_zero_segments_is_a_single_quad() {
        let plane = SharedMesh::plane(1.0, 1.0, 0);
        assert!(plane.check_lengths().is_ok());
        assert_eq!(plane.positions.len(), 4);
        assert_eq!(plane.num_triangles(), 2);
        assert!(plane.positions.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn t_plane_faces_up() {
        let plane = SharedMesh::plane(1.0, 1.0, 2);
        for tri in plane.triangles.chunks_exact(3) {
            let a = plane.positions[tri[0] as usize];
            let b = plane.positions[tri[1] as usize];
            let c = plane.positions[tri[2] as usize];
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }
}
