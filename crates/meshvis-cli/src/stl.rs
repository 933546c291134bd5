//! STL reading (binary and ASCII).

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use meshvis_math::Point3;
use meshvis_mesh::TriMesh;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// Parse an STL file, welding vertices with identical positions.
pub fn parse(bytes: &[u8]) -> Result<TriMesh> {
    if is_binary(bytes) {
        parse_binary(bytes)
    } else if bytes.trim_ascii_start().starts_with(b"solid") {
        let text = std::str::from_utf8(bytes).context("ASCII STL is not valid UTF-8")?;
        parse_ascii(text)
    } else {
        bail!("not an STL file ({} bytes)", bytes.len());
    }
}

/// A binary file's size is fully determined by its triangle count; ASCII
/// files may also start with "solid", so the size check comes first.
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    bytes.len() == HEADER_LEN + 4 + count * TRIANGLE_LEN
}

fn parse_binary(bytes: &[u8]) -> Result<TriMesh> {
    let mut welder = Welder::default();
    let mut triangles = Vec::new();

    for record in bytes[HEADER_LEN + 4..].chunks_exact(TRIANGLE_LEN) {
        // skip the 12-byte facet normal; it is recomputed from the winding
        let mut corners = [0u32; 3];
        for (k, corner) in corners.iter_mut().enumerate() {
            let at = 12 + k * 12;
            let coord = |i: usize| {
                let b = &record[at + 4 * i..at + 4 * i + 4];
                f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64
            };
            *corner = welder.index(Point3::new(coord(0), coord(1), coord(2)));
        }
        triangles.push(corners);
    }

    Ok(TriMesh::from_triangles(welder.positions, triangles)?)
}

fn parse_ascii(text: &str) -> Result<TriMesh> {
    let mut welder = Welder::default();
    let mut triangles = Vec::new();
    let mut facet = Vec::with_capacity(3);

    for (line_no, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("vertex") => {
                let mut coord = || -> Result<f64> {
                    let token = tokens
                        .next()
                        .with_context(|| format!("line {}: missing coordinate", line_no + 1))?;
                    token
                        .parse()
                        .with_context(|| format!("line {}: bad coordinate {token:?}", line_no + 1))
                };
                let p = Point3::new(coord()?, coord()?, coord()?);
                facet.push(welder.index(p));
            }
            Some("endfacet") => {
                if facet.len() != 3 {
                    bail!(
                        "line {}: facet has {} vertices, expected 3",
                        line_no + 1,
                        facet.len()
                    );
                }
                triangles.push([facet[0], facet[1], facet[2]]);
                facet.clear();
            }
            _ => {}
        }
    }

    Ok(TriMesh::from_triangles(welder.positions, triangles)?)
}

/// Deduplicates vertices by exact position.
#[derive(Default)]
struct Welder {
    lookup: HashMap<[u64; 3], u32>,
    positions: Vec<Point3>,
}

impl Welder {
    fn index(&mut self, p: Point3) -> u32 {
        // +0.0 folds negative zero onto zero
        let key = [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()];
        *self.lookup.entry(key).or_insert_with(|| {
            self.positions.push(p);
            (self.positions.len() - 1) as u32
        })
    }
}
