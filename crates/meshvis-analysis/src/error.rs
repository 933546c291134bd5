//! Error types for the analyses.

use meshvis_mesh::MeshError;
use thiserror::Error;

/// Errors that can occur before an analysis pass starts.
///
/// Every variant is raised before any ray is cast, so a failed call never
/// leaves a partially written field behind.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid analysis settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The mesh refers to vertices it does not have.
    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] MeshError),

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
