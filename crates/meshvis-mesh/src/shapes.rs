//! Procedural test shapes.
//!
//! All shapes are closed, consistently wound with outward normals, and
//! centered on the origin.

use std::f64::consts::PI;

use meshvis_math::{Point3, Vec3};

use crate::{Face, TriMesh, Vertex};

/// Corner triangles of an axis-aligned box; corner `i` has x = bit 0,
/// y = bit 1, z = bit 2.
#[rustfmt::skip]
const BOX_TRIANGLES: [[u32; 3]; 12] = [
    [0, 2, 3], [0, 3, 1], // -z
    [4, 5, 7], [4, 7, 6], // +z
    [0, 1, 5], [0, 5, 4], // -y
    [2, 6, 7], [2, 7, 3], // +y
    [0, 4, 6], [0, 6, 2], // -x
    [1, 3, 7], [1, 7, 5], // +x
];

/// An axis-aligned box with the given side lengths.
pub fn cuboid(extent: Vec3) -> TriMesh {
    let vertices = (0..8)
        .map(|i| {
            let corner = Vec3::new(
                (i & 1) as f64 - 0.5,
                ((i >> 1) & 1) as f64 - 0.5,
                ((i >> 2) & 1) as f64 - 0.5,
            );
            Vertex::new(Point3::from(corner.component_mul(&extent)))
        })
        .collect();
    let faces = BOX_TRIANGLES.iter().map(|&t| Face::new(t)).collect();
    let mut mesh = TriMesh { vertices, faces };
    mesh.update_normals();
    mesh
}

/// A cube with side length `size`.
pub fn cube(size: f64) -> TriMesh {
    cuboid(Vec3::new(size, size, size))
}

/// A latitude/longitude sphere.
///
/// `segments` is clamped to at least 3 and `rings` to at least 2.
pub fn uv_sphere(radius: f64, segments: u32, rings: u32) -> TriMesh {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut positions = vec![Point3::new(0.0, 0.0, radius)];
    for i in 1..rings {
        let theta = PI * i as f64 / rings as f64;
        let (r, z) = (radius * theta.sin(), radius * theta.cos());
        for j in 0..segments {
            let phi = 2.0 * PI * j as f64 / segments as f64;
            positions.push(Point3::new(r * phi.cos(), r * phi.sin(), z));
        }
    }
    let south = positions.len() as u32;
    positions.push(Point3::new(0.0, 0.0, -radius));

    let ring = |i: u32, j: u32| 1 + (i - 1) * segments + j % segments;
    let mut triangles = Vec::new();
    for j in 0..segments {
        triangles.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..rings - 1 {
        for j in 0..segments {
            let (u0, u1) = (ring(i, j), ring(i, j + 1));
            let (l0, l1) = (ring(i + 1, j), ring(i + 1, j + 1));
            triangles.push([u0, l0, l1]);
            triangles.push([u0, l1, u1]);
        }
    }
    for j in 0..segments {
        triangles.push([south, ring(rings - 1, j + 1), ring(rings - 1, j)]);
    }

    let mut mesh = TriMesh {
        vertices: positions.into_iter().map(Vertex::new).collect(),
        faces: triangles.into_iter().map(Face::new).collect(),
    };
    mesh.update_normals();
    mesh
}
