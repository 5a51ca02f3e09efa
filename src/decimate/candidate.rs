use glam::DVec3;

use super::queue::{Candidate, PairKey};
use crate::{
    connected::{ConnectedMesh, EdgeKind},
    element::{Handle, PH},
    quadric::SymmetricMatrix,
};

/// Below this determinant the quadric system is treated as singular.
pub(crate) const DET_EPSILON: f64 = 1e-3;

/// Normal flips are detected with this slack so grazing rotations pass.
pub(crate) const INVERT_EPSILON: f64 = 1e-3;

/// Error assigned to hard-hard edges without a continuous seam. Large enough
/// to rank after every real error, but still ahead of the never-collapse tier.
pub(crate) const ERROR_HARD_CAP: f64 = 1e250;

/// Error assigned to edges that must never be collapsed.
pub(crate) const ERROR_NO_COLLAPSE: f64 = 1e300;

/// Sum the fundamental quadrics of the faces around a position.
pub(crate) fn position_quadric(mesh: &ConnectedMesh, p: PH) -> SymmetricMatrix {
    let mut quadric = SymmetricMatrix::default();
    if let Some(start) = mesh.node_at(p) {
        let point = mesh.position(p);
        for n in mesh.sibling_ring(start) {
            // Degenerate faces normalize to zero and contribute nothing.
            let normal = mesh.face_normal(n).normalize_or_zero();
            quadric += SymmetricMatrix::plane(normal, -normal.dot(point));
        }
    }
    quadric
}

/// Deviation of `a` from the line through `b` and `c`, as the sine of the
/// angle at `a`. Zero when the three border points are colinear.
fn lineic_error(a: DVec3, b: DVec3, c: DVec3) -> f64 {
    (b - a).angle_between(c - a).sin()
}

/**
 * Evaluate the collapse of an edge into a merged position and its error.
 *
 * The edge classification decides the strategy: free quadric minimization on
 * manifold edges, pinning to the constrained endpoint when only one side is
 * hard or touches a border, colinearity along the border polyline for true
 * border edges, and sentinel errors for the shapes that must never (or only
 * as a last resort) collapse.
 */
pub(crate) fn evaluate(
    mesh: &ConnectedMesh,
    quadrics: &[SymmetricMatrix],
    key: PairKey,
) -> Candidate {
    let p1 = mesh.position(key.a);
    let p2 = mesh.position(key.b);
    let midpoint = (p1 + p2) / 2.0;
    let (Some(node_a), Some(node_b)) = (mesh.node_at(key.a), mesh.node_at(key.b)) else {
        return Candidate {
            error: ERROR_NO_COLLAPSE,
            position: midpoint,
            kind: EdgeKind::Unknown,
        };
    };
    let quadric_of = |p: PH| quadrics[p.index() as usize];
    let kind = mesh.edge_kind(node_a, node_b);
    let (error, position) = match kind {
        EdgeKind::Surface | EdgeKind::HardSeam => {
            let quadric = quadric_of(key.a) + quadric_of(key.b);
            match quadric.minimizer(DET_EPSILON) {
                Some(p) => (quadric.error(p), p),
                None => {
                    // Singular system: best of the endpoints and the middle.
                    let e1 = quadric.error(p1);
                    let e2 = quadric.error(p2);
                    let e3 = quadric.error(midpoint);
                    let error = e1.min(e2).min(e3);
                    if e1 == error {
                        (error, p1)
                    } else if e2 == error {
                        (error, p2)
                    } else {
                        (error, midpoint)
                    }
                }
            }
        }
        EdgeKind::HardA | EdgeKind::TouchesBorderA | EdgeKind::TouchesBorderAHardB => {
            ((quadric_of(key.a) + quadric_of(key.b)).error(p1), p1)
        }
        EdgeKind::HardB | EdgeKind::TouchesBorderB | EdgeKind::TouchesBorderBHardA => {
            ((quadric_of(key.a) + quadric_of(key.b)).error(p2), p2)
        }
        EdgeKind::Border {
            neighbor_a,
            neighbor_b,
        } => {
            let p1o = mesh.position(mesh.node(neighbor_a).position);
            let p2o = mesh.position(mesh.node(neighbor_b).position);
            let e1 = lineic_error(p1, p2, p2o);
            let e2 = lineic_error(p2, p1, p1o);
            if e1 <= e2 { (e1, p1) } else { (e2, p2) }
        }
        EdgeKind::HardBoth => (ERROR_HARD_CAP, midpoint),
        EdgeKind::TouchesBorderBoth | EdgeKind::Unknown => (ERROR_NO_COLLAPSE, midpoint),
    };
    Candidate {
        error: error.abs(),
        position,
        kind,
    }
}

/// True when moving both endpoints to `target` keeps the orientation of
/// every incident face that survives the collapse.
pub(crate) fn keeps_orientation(mesh: &ConnectedMesh, key: PairKey, target: DVec3) -> bool {
    keeps_orientation_around(mesh, key.a, key.b, target)
        && keeps_orientation_around(mesh, key.b, key.a, target)
}

fn keeps_orientation_around(mesh: &ConnectedMesh, center: PH, other: PH, target: DVec3) -> bool {
    let Some(start) = mesh.node_at(center) else {
        return true;
    };
    let origin = mesh.position(center);
    for sibling in mesh.sibling_ring(start) {
        let pos_c = mesh.node(mesh.node(sibling).relative).position;
        let pos_d = mesh
            .node(mesh.node(mesh.node(sibling).relative).relative)
            .position;
        // Faces containing the whole edge disappear with the collapse.
        if pos_c == other || pos_d == other {
            continue;
        }
        let c = mesh.position(pos_c);
        let d = mesh.position(pos_d);
        let before = (c - origin).cross(d - origin).normalize_or_zero();
        let after = (c - target).cross(d - target).normalize_or_zero();
        if before.dot(after) < -INVERT_EPSILON {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod test {
    use glam::dvec3;

    use super::{ERROR_NO_COLLAPSE, evaluate, keeps_orientation, position_quadric};
    use crate::{
        connected::ConnectedMesh, decimate::queue::PairKey, element::PH, mesh::SharedMesh,
        quadric::SymmetricMatrix,
    };

    fn quadrics(mesh: &ConnectedMesh) -> Vec<SymmetricMatrix> {
        (0..mesh.num_positions() as u32)
            .map(|p| position_quadric(mesh, p.into()))
            .collect()
    }

    #[test]
    fn t_flat_fan_collapses_for_free() {
        // Vertex 0 sits in the middle of a flat square fan; merging it into
        // any neighbor costs nothing.
        let shared = SharedMesh {
            positions: vec![
                dvec3(0.0, 0.0, 0.0),
                dvec3(1.0, 0.0, 0.0),
                dvec3(0.0, 1.0, 0.0),
                dvec3(-1.0, 0.0, 0.0),
                dvec3(0.0, -1.0, 0.0),
            ],
            normals: None,
            uvs: None,
            triangles: vec![0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 1],
        };
        let mesh = ConnectedMesh::build(&shared).expect("cannot build mesh");
        let quadrics = quadrics(&mesh);
        let candidate = evaluate(&mesh, &quadrics, PairKey::new(0.into(), 1.into()));
        assert!(candidate.error < 1e-9);
        assert!(candidate.position.z.abs() < 1e-9);
    }

    #[test]
    fn t_tetrahedron_edges_are_expensive() {
        let shared = SharedMesh {
            positions: vec![
                dvec3(1.0, 1.0, 1.0),
                dvec3(1.0, -1.0, -1.0),
                dvec3(-1.0, 1.0, -1.0),
                dvec3(-1.0, -1.0, 1.0),
            ],
            normals: None,
            uvs: None,
            triangles: vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
        };
        let mesh = ConnectedMesh::build(&shared).expect("cannot build mesh");
        let quadrics = quadrics(&mesh);
        let candidate = evaluate(&mesh, &quadrics, PairKey::new(0.into(), 1.into()));
        // Every collapse on a tetrahedron flattens it, so the error reflects
        // real distance to the removed planes.
        assert!(candidate.error > 1e-3);
        assert!(candidate.error < super::ERROR_HARD_CAP);
    }

    #[test]
    fn t_interior_edge_of_open_strip_is_never_collapsed() {
        let shared = SharedMesh {
            positions: vec![
                dvec3(0.0, 0.0, 0.0),
                dvec3(1.0, 0.0, 0.0),
                dvec3(0.5, 1.0, 0.0),
                dvec3(1.5, 1.0, 0.0),
            ],
            normals: None,
            uvs: None,
            triangles: vec![0, 1, 2, 1, 3, 2],
        };
        let mesh = ConnectedMesh::build(&shared).expect("cannot build mesh");
        let quadrics = quadrics(&mesh);
        // (1, 2) connects two border vertices through the surface.
        let candidate = evaluate(&mesh, &quadrics, PairKey::new(1.into(), 2.into()));
        assert_eq!(candidate.error, ERROR_NO_COLLAPSE);
    }

    #[test]
    fn t_straight_border_is_cheap_and_corner_is_not() {
        let mesh = ConnectedMesh::build(&SharedMesh::plane(2.0, 2.0, 2)).expect("cannot build");
        let quadrics = quadrics(&mesh);
        // Positions 0, 1, 2 run along the straight bottom border; merging the
        // middle one into the corner loses nothing.
        let straight = evaluate(&mesh, &quadrics, PairKey::new(0.into(), 1.into()));
        assert!(straight.error < 1e-9);
        // On a single quad every border edge turns a corner at both ends, so
        // the colinearity error is sin(45 degrees) whichever end survives.
        let quad = ConnectedMesh::build(&SharedMesh::plane(2.0, 2.0, 1)).expect("cannot build");
        let quadrics = (0..quad.num_positions() as u32)
            .map(|p| position_quadric(&quad, PH::from(p)))
            .collect::<Vec<_>>();
        let corner = evaluate(&quad, &quadrics, PairKey::new(0.into(), 1.into()));
        assert!((corner.error - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn t_orientation_guard_rejects_flip() {
        // A flat fan again. Moving the center along the collapse edge keeps
        // the surviving faces upright (the two faces containing vertex 1
        // vanish and are exempt); moving it past the opposite rim flips
        // faces (0, 2, 3) and (0, 3, 4).
        let shared = SharedMesh {
            positions: vec![
                dvec3(0.0, 0.0, 0.0),
                dvec3(1.0, 0.0, 0.0),
                dvec3(0.0, 1.0, 0.0),
                dvec3(-1.0, 0.0, 0.0),
                dvec3(0.0, -1.0, 0.0),
            ],
            normals: None,
            uvs: None,
            triangles: vec![0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 1],
        };
        let mesh = ConnectedMesh::build(&shared).expect("cannot build mesh");
        let key = PairKey::new(0.into(), 1.into());
        assert!(keeps_orientation(&mesh, key, dvec3(1.0, 0.0, 0.0)));
        assert!(!keeps_orientation(&mesh, key, dvec3(0.0, 5.0, 0.0)));
    }
}
