//! Per-face reduction of ray hits into one scalar.

use meshvis_math::Tolerance;
use meshvis_mesh::TriMesh;
use meshvis_raytrace::{Bvh, Ray};

use crate::sampler::{face_rng, sample, FaceFrame};
use crate::settings::{AnalysisMode, AnalysisSettings, SdfStatistic};

/// Result of evaluating one face.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceOutcome {
    /// Scalar value, or `None` when the face could not be evaluated
    /// (degenerate geometry or no rays).
    pub value: Option<f64>,
    /// Whether the face's winding should be reversed (normal analysis).
    pub flip: bool,
}

impl FaceOutcome {
    fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            flip: false,
        }
    }
}

/// Share of re-entering rays above which a face counts as inverted.
pub const FLIP_THRESHOLD: f64 = 0.5;

/// Evaluates faces of one mesh against its geometry index.
///
/// Holds only shared references, so one evaluator can be used from every
/// worker at once.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    mesh: &'a TriMesh,
    bvh: &'a Bvh,
    mode: AnalysisMode,
    ray_count: u32,
    seed: u64,
    tol: Tolerance,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator for `mesh`, whose triangles `bvh` was built from.
    pub fn new(mesh: &'a TriMesh, bvh: &'a Bvh, settings: &AnalysisSettings) -> Self {
        Self {
            mesh,
            bvh,
            mode: settings.mode,
            ray_count: settings.ray_count,
            seed: settings.seed,
            tol: Tolerance::for_scale(mesh.diagonal()),
        }
    }

    /// Ray offset and hit threshold used for this mesh.
    pub fn epsilon(&self) -> f64 {
        self.tol.linear
    }

    /// Reference point and normal of face `f`, or `None` if it is degenerate.
    pub fn frame(&self, f: usize) -> Option<FaceFrame> {
        if self.mesh.face_is_degenerate(f, &self.tol) {
            return None;
        }
        Some(FaceFrame {
            point: self.mesh.barycenter(f),
            normal: self.mesh.face_direction(f)?,
        })
    }

    /// Sample and reduce face `f`.
    pub fn evaluate_face(&self, f: usize) -> FaceOutcome {
        let Some(frame) = self.frame(f) else {
            return FaceOutcome::default();
        };
        let mut rng = face_rng(self.seed, f);
        let rays = sample(&frame, &self.mode, self.ray_count, self.epsilon(), &mut rng);
        self.reduce(&rays, f as u32)
    }

    /// Reduce the rays of face `source` according to the active mode.
    pub fn reduce(&self, rays: &[Ray], source: u32) -> FaceOutcome {
        if rays.is_empty() {
            return FaceOutcome::default();
        }
        let eps = self.epsilon();
        let skip = Some(source);
        // distances are measured from the reference point, not the
        // offset origin
        let hit_distance =
            |ray: &Ray| self.bvh.nearest_hit(ray, eps, skip).map(|hit| hit.t + eps);

        match self.mode {
            AnalysisMode::Obscurance { tau } => {
                let distances: Vec<f64> = rays.iter().filter_map(hit_distance).collect();
                FaceOutcome::value(obscurance(&distances, rays.len(), tau))
            }
            AnalysisMode::AmbientOcclusion => {
                let hits = rays
                    .iter()
                    .filter(|ray| self.bvh.occluded(ray, eps, skip))
                    .count();
                FaceOutcome::value(hits as f64 / rays.len() as f64)
            }
            AnalysisMode::Sdf { statistic, .. } => {
                let mut distances: Vec<f64> = rays.iter().filter_map(hit_distance).collect();
                FaceOutcome::value(sdf(&mut distances, &statistic))
            }
            AnalysisMode::DirectionalVisibility { .. } => {
                let occluded = rays.iter().any(|ray| self.bvh.occluded(ray, eps, skip));
                FaceOutcome::value(if occluded { 0.0 } else { 1.0 })
            }
            AnalysisMode::NormalAnalysis => {
                let entering = rays
                    .iter()
                    .filter(|ray| crossings(self.bvh, ray, eps, skip) % 2 == 1)
                    .count();
                let share = entering as f64 / rays.len() as f64;
                FaceOutcome {
                    value: Some(share),
                    flip: share > FLIP_THRESHOLD,
                }
            }
        }
    }
}

/// Obscurance from the hit distances of `ray_count` rays (misses omitted).
///
/// Each hit contributes `exp(-distance / tau)`; the sum is averaged over all
/// rays and clamped to `[0, 1]`.
pub fn obscurance(distances: &[f64], ray_count: usize, tau: f64) -> f64 {
    if ray_count == 0 {
        return 0.0;
    }
    // an empty f64 sum is -0.0; start the fold from +0.0 instead
    let sum = distances.iter().fold(0.0, |s, d| s + (-d / tau).exp());
    (sum / ray_count as f64).clamp(0.0, 1.0)
}

/// Thickness from the hit distances inside the cone; 0 when nothing was hit.
pub fn sdf(distances: &mut [f64], statistic: &SdfStatistic) -> f64 {
    statistic.reduce(distances).unwrap_or(0.0)
}

/// Number of times `ray` crosses the surface.
///
/// Hits closer together than `eps` are merged, so a ray passing through an
/// edge shared by two triangles counts once.
fn crossings(bvh: &Bvh, ray: &Ray, eps: f64, skip: Option<u32>) -> usize {
    let hits = bvh.all_hits(ray, eps, skip);
    let mut count = 0;
    let mut last = f64::NEG_INFINITY;
    for hit in hits {
        if hit.t - last > eps {
            count += 1;
        }
        last = hit.t;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshvis_math::{Point3, Vec3};
    use crate::settings::DEFAULT_CONE_ANGLE;
    use meshvis_mesh::shapes::{cube, cuboid};

    #[test]
    fn test_obscurance_no_hits_is_zero() {
        assert_eq!(obscurance(&[], 16, 0.1), 0.0);
        assert!(obscurance(&[], 16, 0.1).is_sign_positive());
        assert_eq!(obscurance(&[], 0, 0.1), 0.0);
    }

    #[test]
    fn test_obscurance_formula() {
        let value = obscurance(&[0.1, 0.2], 4, 0.1);
        assert_relative_eq!(value, ((-1.0f64).exp() + (-2.0f64).exp()) / 4.0, epsilon = 1e-15);
    }

    #[test]
    fn test_obscurance_decreases_with_tau() {
        let distances = [0.05, 0.3, 1.2];
        let mut previous = f64::INFINITY;
        for tau in [10.0, 1.0, 0.5, 0.1, 0.01] {
            let value = obscurance(&distances, 8, tau);
            assert!(value <= previous);
            assert!((0.0..=1.0).contains(&value));
            previous = value;
        }
    }

    #[test]
    fn test_sdf_no_hit_is_zero() {
        assert_eq!(sdf(&mut [], &SdfStatistic::Median), 0.0);
    }

    #[test]
    fn test_cube_crossings() {
        let mesh = cube(2.0);
        let bvh = Bvh::build(&mesh);
        let outside = Ray::new(Point3::new(0.1, 0.2, -5.0), Vec3::z());
        assert_eq!(crossings(&bvh, &outside, 1e-9, None), 2);
        let inside = Ray::new(Point3::new(0.1, 0.2, 0.3), Vec3::z());
        assert_eq!(crossings(&bvh, &inside, 1e-9, None), 1);
        let miss = Ray::new(Point3::new(3.0, 0.2, -5.0), Vec3::z());
        assert_eq!(crossings(&bvh, &miss, 1e-9, None), 0);
    }

    #[test]
    fn test_degenerate_face_is_undefined() {
        let mut mesh = cube(1.0);
        mesh.faces.push(meshvis_mesh::Face::new([0, 1, 1]));
        let bvh = Bvh::build(&mesh);
        let settings = AnalysisSettings::new(AnalysisMode::AmbientOcclusion).with_rays(8);
        let evaluator = Evaluator::new(&mesh, &bvh, &settings);
        assert!(evaluator.frame(12).is_none());
        assert_eq!(evaluator.evaluate_face(12), FaceOutcome::default());
        assert!(evaluator.evaluate_face(0).value.is_some());
    }

    #[test]
    fn test_empty_ray_set_is_undefined() {
        let mesh = cube(1.0);
        let bvh = Bvh::build(&mesh);
        let settings = AnalysisSettings::new(AnalysisMode::obscurance());
        let evaluator = Evaluator::new(&mesh, &bvh, &settings);
        assert_eq!(evaluator.reduce(&[], 0), FaceOutcome::default());
    }

    #[test]
    fn test_sdf_measures_slab_thickness() {
        let mesh = cuboid(Vec3::new(4.0, 4.0, 0.2));
        let bvh = Bvh::build(&mesh);
        let settings = AnalysisSettings::new(AnalysisMode::sdf()).with_rays(32);
        let evaluator = Evaluator::new(&mesh, &bvh, &settings);
        // faces 0..4 are the bottom and top of the slab
        for f in 0..4 {
            let value = evaluator.evaluate_face(f).value.unwrap();
            let upper = 0.2 / DEFAULT_CONE_ANGLE.cos() + 1e-6;
            assert!((0.2 - 1e-6..upper).contains(&value), "face {f}: {value}");
        }
    }

    #[test]
    fn test_inverted_face_is_flagged() {
        let mut mesh = cube(1.0);
        mesh.flip_face(4);
        let bvh = Bvh::build(&mesh);
        let settings = AnalysisSettings::new(AnalysisMode::NormalAnalysis).with_rays(16);
        let evaluator = Evaluator::new(&mesh, &bvh, &settings);
        let flipped = evaluator.evaluate_face(4);
        assert!(flipped.flip);
        assert_eq!(flipped.value, Some(1.0));
        let good = evaluator.evaluate_face(0);
        assert!(!good.flip);
        assert_eq!(good.value, Some(0.0));
    }
}
