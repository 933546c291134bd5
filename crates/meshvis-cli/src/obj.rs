//! Wavefront OBJ reading through `tobj`.
//!
//! Polygons are triangulated on load and every object or group becomes part
//! of one mesh. Materials, texture coordinates and normals are ignored.

use std::io::BufRead;

use anyhow::{Context, Result};
use meshvis_math::Point3;
use meshvis_mesh::TriMesh;

/// Parse OBJ text into a triangle mesh.
pub fn parse(text: &str) -> Result<TriMesh> {
    load(&mut text.as_bytes())
}

fn load<B: BufRead>(reader: &mut B) -> Result<TriMesh> {
    let options = tobj::LoadOptions {
        triangulate: true,
        // keep position indices so corners sharing a position share a vertex
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };
    let (models, _) = tobj::load_obj_buf(reader, &options, |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .context("invalid OBJ data")?;

    let mut mesh = TriMesh::new();
    for model in models {
        let positions = model
            .mesh
            .positions
            .chunks_exact(3)
            .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
            .collect();
        let triangles = model
            .mesh
            .indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        let part = TriMesh::from_triangles(positions, triangles)
            .with_context(|| format!("object {:?}", model.name))?;
        mesh.merge(&part);
    }
    Ok(mesh)
}
