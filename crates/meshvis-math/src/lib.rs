#![warn(missing_docs)]

//! Math types for meshvis.
//!
//! Thin wrappers around nalgebra providing the types used throughout the
//! surface analysis crates: points, vectors, directions, local shading
//! frames, and tolerance constants.

use nalgebra::{Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// An orthonormal frame whose `normal` axis is the local +Z.
///
/// Used to map directions sampled around the Z axis (hemispheres, cones)
/// onto an arbitrary axis in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Local X axis.
    pub tangent: Vec3,
    /// Local Y axis.
    pub bitangent: Vec3,
    /// Local Z axis.
    pub normal: Vec3,
}

impl Frame {
    /// Build a frame around `normal`.
    ///
    /// Uses the branchless construction of Duff et al. (2017), which stays
    /// continuous everywhere except at `normal.z == -0.0`.
    pub fn from_normal(normal: &Dir3) -> Self {
        let n = normal.into_inner();
        let sign = 1.0_f64.copysign(n.z);
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;
        let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);
        Self {
            tangent,
            bitangent,
            normal: n,
        }
    }

    /// Map a local direction (x along tangent, z along normal) to world space.
    #[inline]
    pub fn to_world(&self, local: &Vec3) -> Vec3 {
        self.tangent * local.x + self.bitangent * local.y + self.normal * local.z
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance, relative to the model scale.
    pub linear: f64,
    /// Threshold on the squared norm of a triangle's edge cross product
    /// (four times its squared area) below which it counts as degenerate.
    pub area: f64,
}

impl Tolerance {
    /// Tolerances scaled to a model whose bounding box diagonal is `diagonal`.
    ///
    /// The ray offset used to escape the source triangle grows with the
    /// model so that large meshes do not self-intersect through round-off.
    pub fn for_scale(diagonal: f64) -> Self {
        let scale = if diagonal.is_finite() && diagonal > 0.0 {
            diagonal
        } else {
            1.0
        };
        Self {
            linear: 1e-6 * scale,
            area: 1e-24 * scale.powi(4),
        }
    }
}
