//! Per-face ray generation.
//!
//! Every face draws its directions from its own generator, seeded from the
//! pass seed and the face index, so a face's rays never depend on which
//! worker evaluates it or in what order.

use std::f64::consts::TAU;

use meshvis_math::{Dir3, Frame, Point3, Vec3};
use meshvis_raytrace::Ray;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::settings::AnalysisMode;

/// Where a face's rays start and which way the face points.
#[derive(Debug, Clone, Copy)]
pub struct FaceFrame {
    /// Face reference point (barycenter).
    pub point: Point3,
    /// Unit face normal.
    pub normal: Dir3,
}

/// Deterministic generator for face `face` under pass seed `seed`.
pub fn face_rng(seed: u64, face: usize) -> StdRng {
    StdRng::seed_from_u64(splitmix64(seed ^ splitmix64(face as u64)))
}

/// One SplitMix64 step; decorrelates neighbouring face indices.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Cosine-weighted direction in the +Z hemisphere.
fn cosine_hemisphere<R: Rng>(rng: &mut R) -> Vec3 {
    let u1: f64 = rng.gen();
    let u2: f64 = rng.gen();
    let r = u1.sqrt();
    let phi = TAU * u2;
    Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).sqrt())
}

/// Direction uniformly distributed (by solid angle) in the cone of
/// half-angle `half_angle` around +Z.
fn uniform_cone<R: Rng>(rng: &mut R, half_angle: f64) -> Vec3 {
    let u1: f64 = rng.gen();
    let u2: f64 = rng.gen();
    let cos_theta = 1.0 - u1 * (1.0 - half_angle.cos());
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = TAU * u2;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Generate the rays for one face.
///
/// Returns exactly `ray_count` rays (none when `ray_count` is 0). Origins
/// sit on the face reference point, pushed `offset` along the side the
/// rays leave from, so they do not start on the face itself.
pub fn sample<R: Rng>(
    frame: &FaceFrame,
    mode: &AnalysisMode,
    ray_count: u32,
    offset: f64,
    rng: &mut R,
) -> Vec<Ray> {
    let n = frame.normal.into_inner();
    let count = ray_count as usize;

    match *mode {
        AnalysisMode::Obscurance { .. }
        | AnalysisMode::AmbientOcclusion
        | AnalysisMode::NormalAnalysis => {
            let basis = Frame::from_normal(&frame.normal);
            let origin = frame.point + n * offset;
            (0..count)
                .map(|_| {
                    let d = basis.to_world(&cosine_hemisphere(rng));
                    Ray::new(origin, d)
                })
                .collect()
        }
        AnalysisMode::Sdf { cone_angle, .. } => {
            let inward = Dir3::new_unchecked(-n);
            let basis = Frame::from_normal(&inward);
            let origin = frame.point - n * offset;
            (0..count)
                .map(|_| Ray::new(origin, basis.to_world(&uniform_cone(rng, cone_angle))))
                .collect()
        }
        AnalysisMode::DirectionalVisibility { direction, jitter } => {
            let axis = Dir3::new_normalize(Vec3::from(direction));
            let origin = frame.point + n * offset;
            if jitter > 0.0 {
                let basis = Frame::from_normal(&axis);
                (0..count)
                    .map(|_| Ray::new(origin, basis.to_world(&uniform_cone(rng, jitter))))
                    .collect()
            } else {
                vec![Ray::from_dir(origin, axis); count]
            }
        }
    }
}
