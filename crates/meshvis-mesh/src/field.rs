//! Per-face scalar fields and their propagation to vertices.

use meshvis_math::Tolerance;

use crate::TriMesh;

/// Value given to faces and vertices that have nothing to report.
pub const NEUTRAL: f64 = 0.0;

/// A scalar value per face, with a flag for faces whose value is undefined
/// (degenerate geometry, or no rays to evaluate).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceField {
    values: Vec<f64>,
    defined: Vec<bool>,
}

impl FaceField {
    /// Collect a field from optional per-face values; `None` becomes
    /// [`NEUTRAL`] and is marked undefined.
    pub fn from_options<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        let (values, defined) = iter
            .into_iter()
            .map(|v| (v.unwrap_or(NEUTRAL), v.is_some()))
            .unzip();
        Self { values, defined }
    }

    /// Number of faces.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the field covers no faces.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of face `f`, or `None` if undefined.
    pub fn get(&self, f: usize) -> Option<f64> {
        self.defined[f].then(|| self.values[f])
    }

    /// Raw values, with [`NEUTRAL`] in undefined slots.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Whether face `f` holds a value.
    pub fn is_defined(&self, f: usize) -> bool {
        self.defined[f]
    }

    /// Number of faces holding a value.
    pub fn defined_count(&self) -> usize {
        self.defined.iter().filter(|&&d| d).count()
    }

    /// Defined values only, in face order.
    pub fn iter_defined(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .zip(&self.defined)
            .enumerate()
            .filter(|(_, (_, &d))| d)
            .map(|(f, (&v, _))| (f, v))
    }
}

/// Average a face field onto the vertices of `mesh`.
///
/// Each vertex receives the arithmetic mean over its incident faces that are
/// both defined in `field` and non-degenerate. Vertices without any such
/// face get [`NEUTRAL`].
///
/// # Panics
/// Panics if `field` does not have one slot per face.
pub fn vertex_from_face(mesh: &TriMesh, field: &FaceField) -> Vec<f64> {
    assert_eq!(field.len(), mesh.num_faces(), "face field size mismatch");
    let tol = Tolerance::for_scale(mesh.diagonal());

    let mut sums = vec![0.0; mesh.num_vertices()];
    let mut counts = vec![0u32; mesh.num_vertices()];
    for (f, value) in field.iter_defined() {
        if mesh.face_is_degenerate(f, &tol) {
            continue;
        }
        for &v in &mesh.faces[f].vertices {
            sums[v as usize] += value;
            counts[v as usize] += 1;
        }
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, n)| if n == 0 { NEUTRAL } else { sum / n as f64 })
        .collect()
}
