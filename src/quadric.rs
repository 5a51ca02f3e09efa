use std::ops::{Add, AddAssign, Index};

use glam::DVec3;

/**
 * Upper triangle of a symmetric 4x4 quadric matrix, stored row-major as ten
 * coefficients:
 *
 * ```text
 * | 0 1 2 3 |
 * |   4 5 6 |
 * |     7 8 |
 * |       9 |
 * ```
 *
 * Built from plane equations and summed per position; evaluating it at a
 * point yields the squared distance-to-planes error of that point.
 */
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SymmetricMatrix([f64; 10]);

impl SymmetricMatrix {
    /// Fundamental quadric of the plane with unit normal `n` and offset `d`
    /// (plane equation `n.x*x + n.y*y + n.z*z + d = 0`).
    pub fn plane(n: DVec3, d: f64) -> Self {
        SymmetricMatrix([
            n.x * n.x,
            n.x * n.y,
            n.x * n.z,
            n.x * d,
            n.y * n.y,
            n.y * n.z,
            n.y * d,
            n.z * n.z,
            n.z * d,
            d * d,
        ])
    }

    /// Determinant of the 3x3 submatrix picked out by nine coefficient
    /// indices, row by row.
    #[allow(clippy::too_many_arguments)]
    pub fn determinant(
        &self,
        a11: usize,
        a12: usize,
        a13: usize,
        a21: usize,
        a22: usize,
        a23: usize,
        a31: usize,
        a32: usize,
        a33: usize,
    ) -> f64 {
        let m = &self.0;
        m[a11] * m[a22] * m[a33] + m[a13] * m[a21] * m[a32] + m[a12] * m[a23] * m[a31]
            - m[a13] * m[a22] * m[a31]
            - m[a11] * m[a23] * m[a32]
            - m[a12] * m[a21] * m[a33]
    }

    /// Quadric error of a point, i.e. `p^T Q p` with `p = (x, y, z, 1)`.
    pub fn error(&self, p: DVec3) -> f64 {
        let m = &self.0;
        m[0] * p.x * p.x
            + 2.0 * m[1] * p.x * p.y
            + 2.0 * m[2] * p.x * p.z
            + 2.0 * m[3] * p.x
            + m[4] * p.y * p.y
            + 2.0 * m[5] * p.y * p.z
            + 2.0 * m[6] * p.y
            + m[7] * p.z * p.z
            + 2.0 * m[8] * p.z
            + m[9]
    }

    /**
     * Point minimizing the quadric error, found by inverting the derivative
     * system. Returns `None` when the 3x3 position block is close to
     * singular (|det| below `det_epsilon`), in which case the caller must
     * fall back to candidate positions.
     */
    pub fn minimizer(&self, det_epsilon: f64) -> Option<DVec3> {
        let det = self.determinant(0, 1, 2, 1, 4, 5, 2, 5, 7);
        if det.abs() <= det_epsilon {
            return None;
        }
        Some(DVec3 {
            x: -1.0 / det * self.determinant(1, 2, 3, 4, 5, 6, 5, 7, 8),
            y: 1.0 / det * self.determinant(0, 2, 3, 1, 5, 6, 2, 7, 8),
            z: -1.0 / det * self.determinant(0, 1, 3, 1, 4, 6, 2, 5, 8),
        })
    }
}

impl Add for SymmetricMatrix {
    type Output = SymmetricMatrix;

    fn add(self, rhs: SymmetricMatrix) -> SymmetricMatrix {
        let mut out = self.0;
        for (o, r) in out.iter_mut().zip(rhs.0.iter()) {
            *o += r;
        }
        SymmetricMatrix(out)
    }
}

impl AddAssign for SymmetricMatrix {
    fn add_assign(&mut self, rhs: SymmetricMatrix) {
        for (o, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *o += r;
        }
    }
}

impl Index<usize> for SymmetricMatrix {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

#[cfg(test)]
mod test {
    use glam::{DVec3, dvec3};

    use super::SymmetricMatrix;

    #[test]
    fn t_plane_quadric_measures_squared_distance() {
        // Plane z = 2, i.e. normal (0, 0, 1), d = -2.
        let q = SymmetricMatrix::plane(DVec3::Z, -2.0);
        assert_eq!(q.error(dvec3(5.0, -3.0, 2.0)), 0.0);
        assert!((q.error(dvec3(0.0, 0.0, 5.0)) - 9.0).abs() < 1e-12);
        assert!((q.error(dvec3(1.0, 1.0, 0.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn t_sum_of_quadrics_accumulates_errors() {
        let qx = SymmetricMatrix::plane(DVec3::X, 0.0);
        let qy = SymmetricMatrix::plane(DVec3::Y, 0.0);
        let q = qx + qy;
        // Distance to x=0 squared plus distance to y=0 squared.
        assert!((q.error(dvec3(3.0, 4.0, 7.0)) - 25.0).abs() < 1e-12);
        let mut acc = qx;
        acc += qy;
        assert_eq!(acc, q);
    }

    #[test]
    fn t_minimizer_of_three_planes_is_their_intersection() {
        let q = SymmetricMatrix::plane(DVec3::X, -1.0)
            + SymmetricMatrix::plane(DVec3::Y, -2.0)
            + SymmetricMatrix::plane(DVec3::Z, -3.0);
        let p = q.minimizer(1e-3).expect("system should be invertible");
        assert!((p - dvec3(1.0, 2.0, 3.0)).length() < 1e-12);
        assert!(q.error(p).abs() < 1e-12);
    }

    #[test]
    fn t_minimizer_rejects_singular_system() {
        // Two parallel planes leave the system rank deficient.
        let q = SymmetricMatrix::plane(DVec3::Z, 0.0) + SymmetricMatrix::plane(DVec3::Z, -1.0);
        assert!(q.minimizer(1e-3).is_none());
    }
}
