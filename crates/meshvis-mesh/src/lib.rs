#![warn(missing_docs)]

//! Triangle mesh data model for meshvis.
//!
//! A [`TriMesh`] stores indexed triangles together with the per-element
//! attributes the visibility analyses read and write: vertex and face
//! normals, scalar quality, vertex colors, and a face selection flag.
//!
//! - [`field`] - per-face scalar fields and their propagation to vertices
//! - [`color`] - gray-scale mapping of a scalar field to vertex colors
//! - [`shapes`] - small procedural meshes (cubes, spheres, plates)

pub mod color;
pub mod error;
pub mod field;
pub mod shapes;

pub use error::{MeshError, Result};
pub use field::{vertex_from_face, FaceField};

use meshvis_math::{Dir3, Point3, Tolerance, Vec3};

/// A mesh vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Position.
    pub position: Point3,
    /// Unit normal (zero until computed).
    pub normal: Vec3,
    /// Scalar quality written by the analyses.
    pub quality: f64,
    /// RGBA color.
    pub color: [u8; 4],
}

impl Vertex {
    /// Create a vertex at `position` with neutral attributes.
    pub fn new(position: Point3) -> Self {
        Self {
            position,
            normal: Vec3::zeros(),
            quality: 0.0,
            color: [255, 255, 255, 255],
        }
    }
}

/// A triangular face.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Vertex indices in counter-clockwise order seen from outside.
    pub vertices: [u32; 3],
    /// Unit normal (zero for degenerate faces).
    pub normal: Vec3,
    /// Scalar quality written by the analyses.
    pub quality: f64,
    /// Selection flag.
    pub selected: bool,
}

impl Face {
    /// Create a face with neutral attributes.
    pub fn new(vertices: [u32; 3]) -> Self {
        Self {
            vertices,
            normal: Vec3::zeros(),
            quality: 0.0,
            selected: false,
        }
    }
}

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    /// Vertex array.
    pub vertices: Vec<Vertex>,
    /// Face array.
    pub faces: Vec<Face>,
}

impl TriMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from positions and triangle indices.
    ///
    /// Face and vertex normals are computed; indices are checked.
    pub fn from_triangles(positions: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let mut mesh = Self {
            vertices: positions.into_iter().map(Vertex::new).collect(),
            faces: triangles.into_iter().map(Face::new).collect(),
        };
        mesh.check_indices()?;
        mesh.update_normals();
        Ok(mesh)
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Check that every face references an existing vertex.
    pub fn check_indices(&self) -> Result<()> {
        let count = self.vertices.len();
        for (face, f) in self.faces.iter().enumerate() {
            if let Some(&vertex) = f.vertices.iter().find(|&&v| v as usize >= count) {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    vertex,
                    count,
                });
            }
        }
        Ok(())
    }

    /// Corner positions of face `f`.
    #[inline]
    pub fn triangle(&self, f: usize) -> [Point3; 3] {
        let [a, b, c] = self.faces[f].vertices;
        [
            self.vertices[a as usize].position,
            self.vertices[b as usize].position,
            self.vertices[c as usize].position,
        ]
    }

    /// Unnormalized face normal `(b - a) x (c - a)`; its length is twice
    /// the face area.
    #[inline]
    pub fn face_cross(&self, f: usize) -> Vec3 {
        let [a, b, c] = self.triangle(f);
        (b - a).cross(&(c - a))
    }

    /// Area of face `f`.
    pub fn face_area(&self, f: usize) -> f64 {
        0.5 * self.face_cross(f).norm()
    }

    /// Barycenter of face `f`.
    pub fn barycenter(&self, f: usize) -> Point3 {
        let [a, b, c] = self.triangle(f);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Whether face `f` has (numerically) zero area or repeats a vertex.
    pub fn face_is_degenerate(&self, f: usize, tol: &Tolerance) -> bool {
        let [a, b, c] = self.faces[f].vertices;
        if a == b || b == c || a == c {
            return true;
        }
        self.face_cross(f).norm_squared() <= tol.area
    }

    /// Indices of all degenerate faces.
    pub fn degenerate_faces(&self, tol: &Tolerance) -> Vec<usize> {
        (0..self.faces.len())
            .filter(|&f| self.face_is_degenerate(f, tol))
            .collect()
    }

    /// Unit normal of face `f`, or `None` for a degenerate face.
    pub fn face_direction(&self, f: usize) -> Option<Dir3> {
        Dir3::try_new(self.face_cross(f), 0.0)
    }

    /// Axis-aligned bounds of all vertices, or `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(Point3, Point3)> {
        let first = self.vertices.first()?.position;
        let bounds = self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.inf(&v.position), hi.sup(&v.position))
        });
        Some(bounds)
    }

    /// Length of the bounding box diagonal (0 for an empty mesh).
    pub fn diagonal(&self) -> f64 {
        self.bounding_box()
            .map(|(lo, hi)| (hi - lo).norm())
            .unwrap_or(0.0)
    }

    /// Recompute unit face normals from the current winding.
    pub fn update_face_normals(&mut self) {
        for f in 0..self.faces.len() {
            let n = self
                .face_direction(f)
                .map(|d| d.into_inner())
                .unwrap_or_else(Vec3::zeros);
            self.faces[f].normal = n;
        }
    }

    /// Recompute vertex normals as the area-weighted sum of incident face
    /// normals.
    pub fn update_vertex_normals(&mut self) {
        let mut sums = vec![Vec3::zeros(); self.vertices.len()];
        for f in 0..self.faces.len() {
            let cross = self.face_cross(f);
            for &v in &self.faces[f].vertices {
                sums[v as usize] += cross;
            }
        }
        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = sum.try_normalize(0.0).unwrap_or_else(Vec3::zeros);
        }
    }

    /// Recompute face and vertex normals.
    pub fn update_normals(&mut self) {
        self.update_face_normals();
        self.update_vertex_normals();
    }

    /// Reverse the winding of face `f` and negate its normal.
    pub fn flip_face(&mut self, f: usize) {
        let face = &mut self.faces[f];
        face.vertices.swap(1, 2);
        face.normal = -face.normal;
    }

    /// Store `values` as face quality.
    ///
    /// # Panics
    /// Panics if `values.len()` differs from the face count.
    pub fn set_face_quality(&mut self, values: &[f64]) {
        assert_eq!(values.len(), self.faces.len(), "face field size mismatch");
        for (face, &q) in self.faces.iter_mut().zip(values) {
            face.quality = q;
        }
    }

    /// Store `values` as vertex quality.
    ///
    /// # Panics
    /// Panics if `values.len()` differs from the vertex count.
    pub fn set_vertex_quality(&mut self, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.vertices.len(),
            "vertex field size mismatch"
        );
        for (vertex, &q) in self.vertices.iter_mut().zip(values) {
            vertex.quality = q;
        }
    }

    /// Map vertex quality onto a gray ramp in the vertex colors.
    pub fn color_by_vertex_quality(&mut self) {
        let quality: Vec<f64> = self.vertices.iter().map(|v| v.quality).collect();
        for (vertex, color) in self.vertices.iter_mut().zip(color::gray_ramp(&quality)) {
            vertex.color = color;
        }
    }

    /// Append another mesh, offsetting its indices.
    pub fn merge(&mut self, other: &TriMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(other.faces.iter().map(|face| Face {
            vertices: face.vertices.map(|v| v + offset),
            ..face.clone()
        }));
    }
}
