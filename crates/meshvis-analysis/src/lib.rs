#![warn(missing_docs)]

//! Ray-cast surface analyses for triangle meshes.
//!
//! Every face casts a batch of rays against a shared BVH of the mesh and
//! reduces the hits to one scalar: obscurance, ambient occlusion, local
//! thickness (shape-diameter function), visibility along a direction, or
//! the share of rays that re-enter the solid (normal analysis). Face values
//! are written to face quality and averaged into vertex quality.
//!
//! # Example
//!
//! ```
//! use meshvis_analysis::{analyze, AnalysisMode, AnalysisSettings, NoProgress};
//! use meshvis_mesh::shapes::cube;
//!
//! let mut mesh = cube(1.0);
//! let settings = AnalysisSettings::new(AnalysisMode::AmbientOcclusion).with_rays(16);
//! let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
//! assert_eq!(report.face_field.len(), 12);
//! ```

pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod progress;
pub mod sampler;
pub mod settings;

pub use dispatch::{Dispatcher, Strategy};
pub use error::{AnalysisError, Result};
pub use evaluate::{Evaluator, FaceOutcome};
pub use progress::{LogProgress, NoProgress, Progress};
pub use settings::{AnalysisMode, AnalysisSettings, SdfStatistic};

use std::fmt;
use std::time::{Duration, Instant};

use meshvis_math::Tolerance;
use meshvis_mesh::{vertex_from_face, FaceField, TriMesh};
use meshvis_raytrace::Bvh;

/// Stages of one analysis pass, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Settings and mesh validated; nothing built yet.
    Idle,
    /// The BVH over the mesh is ready.
    IndexBuilt,
    /// Face partitions have been handed to the workers.
    Dispatched,
    /// Face values joined and propagated to vertices.
    Propagated,
    /// Mesh attributes written.
    Done,
}

impl Stage {
    /// Progress percentage reported when the stage is entered.
    pub fn percent(self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::IndexBuilt => 10,
            Stage::Dispatched => 20,
            Stage::Propagated => 90,
            Stage::Done => 100,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Idle => "starting",
            Stage::IndexBuilt => "index built",
            Stage::Dispatched => "casting rays",
            Stage::Propagated => "propagating to vertices",
            Stage::Done => "done",
        }
    }

    fn enter(self, progress: &mut dyn Progress) {
        log::debug!("stage {self:?}");
        progress.report(self.percent(), self.label());
    }
}

/// Summary of a finished analysis.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// The mode that was run.
    pub mode: AnalysisMode,
    /// One value per face; degenerate faces are undefined.
    pub face_field: FaceField,
    /// One value per vertex.
    pub vertex_field: Vec<f64>,
    /// Faces whose winding was reversed (normal analysis only).
    pub flipped_faces: Vec<usize>,
    /// Faces skipped as degenerate.
    pub degenerate_faces: Vec<usize>,
    /// Total rays cast over all evaluated faces.
    pub rays_cast: u64,
    /// Wall-clock duration of the pass.
    pub elapsed: Duration,
}

impl AnalysisReport {
    /// Smallest and largest defined face value.
    pub fn face_range(&self) -> Option<(f64, f64)> {
        self.face_field.iter_defined().fold(None, |acc, (_, v)| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Mean of the defined face values.
    pub fn face_mean(&self) -> Option<f64> {
        let count = self.face_field.defined_count();
        if count == 0 {
            return None;
        }
        let sum: f64 = self.face_field.iter_defined().map(|(_, v)| v).sum();
        Some(sum / count as f64)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode:       {}", self.mode)?;
        writeln!(
            f,
            "faces:      {} ({} degenerate)",
            self.face_field.len(),
            self.degenerate_faces.len()
        )?;
        writeln!(f, "vertices:   {}", self.vertex_field.len())?;
        writeln!(f, "rays cast:  {}", self.rays_cast)?;
        if let (Some((lo, hi)), Some(mean)) = (self.face_range(), self.face_mean()) {
            writeln!(f, "face range: {lo:.4} .. {hi:.4} (mean {mean:.4})")?;
        }
        if matches!(self.mode, AnalysisMode::NormalAnalysis) {
            writeln!(f, "flipped:    {}", self.flipped_faces.len())?;
        }
        write!(f, "elapsed:    {:.3}s", self.elapsed.as_secs_f64())
    }
}

/// Run one analysis pass over `mesh`.
///
/// This is the main entry point. It:
/// 1. Validates the settings and the face indices
/// 2. Builds the BVH
/// 3. Evaluates every face across the configured workers
/// 4. Writes face quality, then selection (directional visibility) or
///    flips (normal analysis)
/// 5. Averages face values into vertex quality and vertex colors
///
/// On error the mesh is left untouched. There is no cancellation; a pass
/// runs to completion once dispatched.
pub fn analyze(
    mesh: &mut TriMesh,
    settings: &AnalysisSettings,
    progress: &mut dyn Progress,
) -> Result<AnalysisReport> {
    let started = Instant::now();
    settings.validate()?;
    mesh.check_indices()?;
    let dispatcher = Dispatcher::new(settings.workers, settings.strategy)?;
    Stage::Idle.enter(progress);

    let degenerate_faces = mesh.degenerate_faces(&Tolerance::for_scale(mesh.diagonal()));
    if !degenerate_faces.is_empty() {
        log::warn!(
            "{} of {} faces are degenerate and will be skipped",
            degenerate_faces.len(),
            mesh.num_faces()
        );
    }

    let bvh = Bvh::build(mesh);
    log::debug!("indexed {} of {} faces", bvh.len(), mesh.num_faces());
    Stage::IndexBuilt.enter(progress);

    let outcomes = {
        let evaluator = Evaluator::new(mesh, &bvh, settings);
        Stage::Dispatched.enter(progress);
        dispatcher.run(mesh.num_faces(), |f| evaluator.evaluate_face(f))?
    };

    let face_field = FaceField::from_options(outcomes.iter().map(|o| o.value));
    let evaluated = face_field.defined_count() as u64;
    let rays_cast = evaluated * u64::from(settings.ray_count);

    mesh.set_face_quality(face_field.values());

    if matches!(settings.mode, AnalysisMode::DirectionalVisibility { .. }) {
        for (face, value) in mesh.faces.iter_mut().zip(face_field.values()) {
            face.selected = *value == 1.0;
        }
    }

    let mut flipped_faces = Vec::new();
    if matches!(settings.mode, AnalysisMode::NormalAnalysis) {
        flipped_faces = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.flip)
            .map(|(f, _)| f)
            .collect();
        if !flipped_faces.is_empty() {
            for &f in &flipped_faces {
                mesh.flip_face(f);
            }
            mesh.update_normals();
            log::debug!("flipped {} faces", flipped_faces.len());
        }
    }

    let vertex_field = vertex_from_face(mesh, &face_field);
    Stage::Propagated.enter(progress);

    mesh.set_vertex_quality(&vertex_field);
    if settings.mode.colorizes() {
        mesh.color_by_vertex_quality();
    }

    let elapsed = started.elapsed();
    Stage::Done.enter(progress);
    log::info!(
        "{} on {} faces: {} rays in {:.3}s",
        settings.mode,
        face_field.len(),
        rays_cast,
        elapsed.as_secs_f64()
    );

    Ok(AnalysisReport {
        mode: settings.mode,
        face_field,
        vertex_field,
        flipped_faces,
        degenerate_faces,
        rays_cast,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshvis_mesh::shapes::cube;

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            Stage::Idle,
            Stage::IndexBuilt,
            Stage::Dispatched,
            Stage::Propagated,
            Stage::Done,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].percent() < pair[1].percent());
        }
    }

    #[test]
    fn test_progress_sequence() {
        let mut mesh = cube(1.0);
        let mut seen = Vec::new();
        let mut sink = |p: u8, _: &str| seen.push(p);
        let settings = AnalysisSettings::default().with_rays(4).serial();
        analyze(&mut mesh, &settings, &mut sink).unwrap();
        assert_eq!(seen, vec![0, 10, 20, 90, 100]);
    }

    #[test]
    fn test_report_counts() {
        let mut mesh = cube(1.0);
        let settings = AnalysisSettings::default().with_rays(8).serial();
        let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
        assert_eq!(report.rays_cast, 12 * 8);
        assert_eq!(report.vertex_field.len(), 8);
        assert!(report.degenerate_faces.is_empty());
        assert!(report.flipped_faces.is_empty());
        assert!(report.to_string().contains("ambient_occlusion"));
    }

    #[test]
    fn test_consistent_mesh_keeps_normals() {
        let mut mesh = cube(1.0);
        // caller-supplied normals that differ from the recomputed ones
        for v in &mut mesh.vertices {
            v.normal = meshvis_math::Vec3::z();
        }
        let supplied: Vec<_> = mesh.vertices.iter().map(|v| v.normal).collect();
        let settings = AnalysisSettings::new(AnalysisMode::NormalAnalysis)
            .with_rays(8)
            .serial();
        let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
        assert!(report.flipped_faces.is_empty());
        let after: Vec<_> = mesh.vertices.iter().map(|v| v.normal).collect();
        assert_eq!(after, supplied);
    }

    #[test]
    fn test_no_colors_for_normal_analysis() {
        let mut mesh = cube(1.0);
        let before: Vec<_> = mesh.vertices.iter().map(|v| v.color).collect();
        let settings = AnalysisSettings::new(AnalysisMode::NormalAnalysis)
            .with_rays(8)
            .serial();
        analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
        let after: Vec<_> = mesh.vertices.iter().map(|v| v.color).collect();
        assert_eq!(before, after);
    }
}
