//! ASCII PLY output with per-vertex and per-face analysis results.

use std::io::{self, Write};

use meshvis_mesh::TriMesh;

/// Write `mesh` as ASCII PLY: vertex position, normal, color and quality,
/// then faces with their quality.
pub fn write<W: Write>(mesh: &TriMesh, mut out: W) -> io::Result<()> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "comment meshvis analysis output")?;
    writeln!(out, "element vertex {}", mesh.num_vertices())?;
    for name in ["x", "y", "z", "nx", "ny", "nz"] {
        writeln!(out, "property float {name}")?;
    }
    for name in ["red", "green", "blue", "alpha"] {
        writeln!(out, "property uchar {name}")?;
    }
    writeln!(out, "property float quality")?;
    writeln!(out, "element face {}", mesh.num_faces())?;
    writeln!(out, "property list uchar int vertex_indices")?;
    writeln!(out, "property float quality")?;
    writeln!(out, "end_header")?;

    for v in &mesh.vertices {
        let (p, n, c) = (&v.position, &v.normal, &v.color);
        writeln!(
            out,
            "{} {} {} {} {} {} {} {} {} {} {}",
            p.x as f32, p.y as f32, p.z as f32, n.x as f32, n.y as f32, n.z as f32,
            c[0], c[1], c[2], c[3], v.quality as f32
        )?;
    }
    for face in &mesh.faces {
        let [a, b, c] = face.vertices;
        writeln!(out, "3 {a} {b} {c} {}", face.quality as f32)?;
    }
    out.flush()
}
