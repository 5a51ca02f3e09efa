use glam::{DVec3, Vec2, Vec3};

use crate::error::Error;

/**
 * A flat, indexed triangle mesh. This is the exchange format at the crate
 * boundary: importers and primitive generators produce it, and
 * [`ConnectedMesh`](crate::ConnectedMesh) consumes and produces it.
 *
 * Positions are double precision; the optional per-vertex normals and uvs are
 * single precision. When present, the attribute arrays must have the same
 * length as the positions.
 */
#[derive(Debug, Clone, Default)]
pub struct SharedMesh {
    pub positions: Vec<DVec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    /// Flat list of position indices, three per triangle.
    pub triangles: Vec<u32>,
}

impl SharedMesh {
    pub fn num_triangles(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Validate the index list and attribute array lengths.
    ///
    /// Malformed input must be rejected here, before it can corrupt the
    /// connected representation.
    pub fn check_lengths(&self) -> Result<(), Error> {
        if self.triangles.len() % 3 != 0 {
            return Err(Error::IncorrectIndexCount(self.triangles.len()));
        }
        for &i in &self.triangles {
            if i as usize >= self.positions.len() {
                return Err(Error::IndexOutOfBounds(i, self.positions.len()));
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(Error::MismatchedArrayLengths(
                    normals.len(),
                    self.positions.len(),
                ));
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != self.positions.len() {
                return Err(Error::MismatchedArrayLengths(
                    uvs.len(),
                    self.positions.len(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::{DVec3, Vec3};

    use super::SharedMesh;
    use crate::error::Error;

    #[test]
    fn t_check_lengths_accepts_valid() {
        let mesh = SharedMesh {
            positions: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            normals: Some(vec![Vec3::Z; 3]),
            uvs: None,
            triangles: vec![0, 1, 2],
        };
        assert!(mesh.check_lengths().is_ok());
    }

    #[test]
    fn t_check_lengths_rejects_bad_index() {
        let mesh = SharedMesh {
            positions: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            normals: None,
            uvs: None,
            triangles: vec![0, 1, 3],
        };
        assert!(matches!(
            mesh.check_lengths(),
            Err(Error::IndexOutOfBounds(3, 3))
        ));
    }

    #[test]
    fn t_check_lengths_rejects_partial_triangle() {
        let mesh = SharedMesh {
            positions: vec![DVec3::ZERO, DVec3::X],
            normals: None,
            uvs: None,
            triangles: vec![0, 1],
        };
        assert!(matches!(
            mesh.check_lengths(),
            Err(Error::IncorrectIndexCount(2))
        ));
    }

    #[test]
    fn t_check_lengths_rejects_short_normals() {
        let mesh = SharedMesh {
            positions: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            normals: Some(vec![Vec3::Z; 2]),
            uvs: None,
            triangles: vec![0, 1, 2],
        };
        assert!(matches!(
            mesh.check_lengths(),
            Err(Error::MismatchedArrayLengths(2, 3))
        ));
    }
}
