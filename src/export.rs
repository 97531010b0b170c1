//! Binary STL export of mesh buffers.
//!
//! STL carries positions and faces only; the per-vertex scalar channel is
//! dropped by this sink. The lossless interchange path is the flat-array
//! round trip on [`MeshBuffers`](crate::extrude::MeshBuffers) itself.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::extrude::MeshBuffers;
use crate::geometry::Vector3D;
use crate::Result;

/// Write the mesh as binary STL.
pub fn write_stl<W: Write>(mesh: &MeshBuffers, writer: &mut W) -> Result<()> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .faces
        .iter()
        .map(|face| {
            let a = mesh.vertices[face[0] as usize];
            let b = mesh.vertices[face[1] as usize];
            let c = mesh.vertices[face[2] as usize];

            let cross = (b - a).cross(&(c - a));
            let norm = cross.norm();
            // Degenerate faces get a safe default normal rather than NaN.
            let normal = if norm < 1e-10 || !norm.is_finite() {
                Vector3D::new(0.0, 0.0, 1.0)
            } else {
                cross / norm
            };

            stl_io::Triangle {
                normal: stl_io::Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [
                    stl_io::Vertex::new([a.x as f32, a.y as f32, a.z as f32]),
                    stl_io::Vertex::new([b.x as f32, b.y as f32, b.z as f32]),
                    stl_io::Vertex::new([c.x as f32, c.y as f32, c.z as f32]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(writer, triangles.iter())?;
    Ok(())
}

/// Write the mesh as binary STL to a file path.
pub fn write_stl_file<P: AsRef<Path>>(mesh: &MeshBuffers, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_stl(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}
