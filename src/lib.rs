/*!
# Decimesh

Triangle mesh decimation using quadric error metrics.

Meshes enter and leave as flat [`SharedMesh`] buffers. Internally they are
converted to a [`ConnectedMesh`], where every triangle corner carries two
cyclic links: one around its face and one around its position. Decimation
greedily collapses the cheapest edges while preserving borders, attribute
seams and face orientation.

```rust
use decimesh::{ConnectedMesh, SharedMesh};

fn main() -> Result<(), decimesh::Error> {
    let sphere = SharedMesh::icosphere(1.0, 3);
    let mut mesh = ConnectedMesh::build(&sphere)?;
    mesh.decimate_to_ratio(0.25);
    let simplified = mesh.to_shared_mesh();
    assert!(simplified.num_triangles() <= sphere.num_triangles() / 4);
    Ok(())
}
```

Meshes can also be loaded from and written to Wavefront obj files with
[`SharedMesh::load_obj`] and [`SharedMesh::write_obj`], and near-duplicate
positions welded beforehand with [`ConnectedMesh::merge_positions`].
*/

mod check;
mod connected;
pub mod decimate;
mod element;
mod error;
mod mesh;
mod obj;
mod primitive;
mod quadric;

pub use connected::{ConnectedMesh, EdgeKind, VertexAttribute};
pub use decimate::Decimater;
pub use element::{AH, Handle, NH, PH};
pub use error::Error;
pub use mesh::SharedMesh;
pub use quadric::SymmetricMatrix;
