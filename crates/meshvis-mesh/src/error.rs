//! Error types for mesh construction.

use thiserror::Error;

/// Errors raised when a [`TriMesh`](crate::TriMesh) has inconsistent indices.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A face refers to a vertex that does not exist.
    #[error("face {face} references vertex {vertex}, but the mesh has {count} vertices")]
    IndexOutOfRange {
        /// Offending face.
        face: usize,
        /// Vertex index it references.
        vertex: u32,
        /// Number of vertices in the mesh.
        count: usize,
    },
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
