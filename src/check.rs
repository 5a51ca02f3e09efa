use crate::{connected::ConnectedMesh, element::NH, error::Error};

impl ConnectedMesh {
    /// The face cycle through `n` must return to `n` in exactly three hops
    /// without passing through a removed node.
    pub(crate) fn check_relatives(&self, n: NH) -> Result<(), Error> {
        let mut current = n;
        for _ in 0..3 {
            if self.node(current).is_removed() {
                return Err(Error::RemovedNodeReference(current));
            }
            current = self.node(current).relative;
        }
        if current != n {
            return Err(Error::BrokenRelativeCycle(n));
        }
        Ok(())
    }

    /// The sibling ring through `n` must close on itself, visit only live
    /// nodes, and keep a single position throughout.
    pub(crate) fn check_siblings(&self, n: NH) -> Result<(), Error> {
        let position = self.node(n).position;
        let mut current = n;
        // Bounded by the arena size so a broken ring cannot loop forever.
        for _ in 0..=self.num_nodes() {
            if self.node(current).is_removed() || self.node(current).position != position {
                return Err(Error::RemovedNodeReference(current));
            }
            current = self.node(current).sibling;
            if current == n {
                return Ok(());
            }
        }
        Err(Error::BrokenSiblingRing(n))
    }

    /**
     * Full structural validation of the live topology.
     *
     * Checks every live node's face cycle and sibling ring, the
     * position-to-node index, and the face count. Meant for
     * `debug_assert!(mesh.check().is_ok())` at mutation boundaries.
     */
    pub fn check(&self) -> Result<(), Error> {
        let mut live = 0usize;
        for i in 0..self.num_nodes() {
            let n: NH = (i as u32).into();
            if self.node(n).is_removed() {
                continue;
            }
            live += 1;
            self.check_relatives(n)?;
            self.check_siblings(n)?;
        }
        if live != self.face_count() * 3 {
            return Err(Error::FaceCountMismatch(live / 3, self.face_count()));
        }
        for p in 0..self.num_positions() {
            let p = (p as u32).into();
            match self.node_at(p) {
                Some(n) => {
                    if self.node(n).is_removed() {
                        return Err(Error::RemovedNodeReference(n));
                    }
                    if self.node(n).position != p {
                        return Err(Error::DanglingPositionIndex(p));
                    }
                }
                None => {
                    // No live node may still reference this position.
                    for i in 0..self.num_nodes() {
                        let n: NH = (i as u32).into();
                        if !self.node(n).is_removed() && self.node(n).position == p {
                            return Err(Error::DanglingPositionIndex(p));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::dvec3;

    use crate::{connected::ConnectedMesh, mesh::SharedMesh};

    #[test]
    fn t_check_passes_after_build_and_collapse() {
        let shared = SharedMesh {
            positions: vec![
                dvec3(0.0, 0.0, 0.0),
                dvec3(1.0, 0.0, 0.0),
                dvec3(0.5, 1.0, 0.0),
                dvec3(1.5, 1.0, 0.0),
                dvec3(2.0, 0.0, 0.0),
            ],
            normals: None,
            uvs: None,
            triangles: vec![0, 1, 2, 1, 3, 2, 1, 4, 3],
        };
        let mut mesh = ConnectedMesh::build(&shared).expect("cannot build mesh");
        assert!(mesh.check().is_ok());
        let na = mesh.node_at(1.into()).expect("missing corner");
        let nb = mesh.node_at(3.into()).expect("missing corner");
        let _ = mesh.collapse_edge(na, nb);
        assert!(mesh.check().is_ok());
    }

    #[test]
    fn t_check_detects_broken_ring() {
        let shared = SharedMesh {
            positions: vec![dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0), dvec3(0.5, 1.0, 0.0)],
            normals: None,
            uvs: None,
            triangles: vec![0, 1, 2],
        };
        let mut mesh = ConnectedMesh::build(&shared).expect("cannot build mesh");
        // Point a sibling link across positions.
        mesh.node_mut(0.into()).sibling = 1.into();
        assert!(mesh.check().is_err());
    }
}
