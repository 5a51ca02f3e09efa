use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use glam::{dvec3, vec2, vec3};

use crate::{error::Error, mesh::SharedMesh};

impl SharedMesh {
    /**
     * Load a Wavefront obj file, triangulating polygons and merging all
     * models into one mesh. Normals and uvs are kept only when every model
     * in the file carries them.
     */
    pub fn load_obj(path: &Path) -> Result<Self, Error> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, _) =
            tobj::load_obj(path, &options).map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
        let all_normals = !models.is_empty() && models.iter().all(|m| !m.mesh.normals.is_empty());
        let all_uvs = !models.is_empty() && models.iter().all(|m| !m.mesh.texcoords.is_empty());
        let mut out = SharedMesh {
            normals: all_normals.then(Vec::new),
            uvs: all_uvs.then(Vec::new),
            ..Default::default()
        };
        for model in models {
            let mesh = model.mesh;
            if mesh.positions.len() % 3 != 0 {
                return Err(Error::IncorrectNumberOfCoordinates(mesh.positions.len()));
            }
            let offset = out.positions.len() as u32;
            out.positions.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|p| dvec3(p[0], p[1], p[2])),
            );
            if let Some(normals) = &mut out.normals {
                normals.extend(
                    mesh.normals
                        .chunks_exact(3)
                        .map(|n| vec3(n[0] as f32, n[1] as f32, n[2] as f32)),
                );
            }
            if let Some(uvs) = &mut out.uvs {
                uvs.extend(
                    mesh.texcoords
                        .chunks_exact(2)
                        .map(|t| vec2(t[0] as f32, t[1] as f32)),
                );
            }
            out.triangles.extend(mesh.indices.iter().map(|i| i + offset));
        }
        out.check_lengths()?;
        Ok(out)
    }

    /// Write the mesh as a Wavefront obj file.
    pub fn write_obj(&self, path: &Path) -> Result<(), Error> {
        self.check_lengths()?;
        let file = File::create(path).map_err(|e| Error::ObjWriteFailed(format!("{}", e)))?;
        let mut writer = BufWriter::new(file);
        self.write_obj_impl(&mut writer)
            .map_err(|e| Error::ObjWriteFailed(format!("{}", e)))
    }

    fn write_obj_impl(&self, w: &mut impl Write) -> io::Result<()> {
        for p in &self.positions {
            writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
        }
        if let Some(uvs) = &self.uvs {
            for t in uvs {
                writeln!(w, "vt {} {}", t.x, t.y)?;
            }
        }
        if let Some(normals) = &self.normals {
            for n in normals {
                writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
            }
        }
        // One shared index per vertex, so the face references repeat it.
        for tri in self.triangles.chunks_exact(3) {
            write!(w, "f")?;
            for &i in tri {
                let i = i + 1;
                match (&self.uvs, &self.normals) {
                    (Some(_), Some(_)) => write!(w, " {}/{}/{}", i, i, i)?,
                    (Some(_), None) => write!(w, " {}/{}", i, i)?,
                    (None, Some(_)) => write!(w, " {}//{}", i, i)?,
                    (None, None) => write!(w, " {}", i)?,
                }
            }
            writeln!(w)?;
        }
        Ok(())
    }
}
