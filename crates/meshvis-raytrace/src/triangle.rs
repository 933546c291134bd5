//! Ray-triangle intersection (Möller–Trumbore).

use meshvis_math::Point3;

use crate::Ray;

/// Result of a ray-triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Parameter along the ray.
    pub t: f64,
    /// Barycentric weight of the second corner.
    pub u: f64,
    /// Barycentric weight of the third corner.
    pub v: f64,
    /// Whether the ray travels along the triangle's normal.
    pub backface: bool,
}

/// Intersect a ray with a triangle, from either side.
///
/// Returns `None` when the ray is parallel to the triangle's plane, misses
/// it, hits behind the origin, or the triangle is degenerate. Edges and
/// corners count as inside.
#[inline]
pub fn intersect_triangle(ray: &Ray, corners: &[Point3; 3]) -> Option<TriangleHit> {
    let [a, b, c] = corners;
    let e1 = b - a;
    let e2 = c - a;
    let d = ray.direction.as_ref();

    let p = d.cross(&e2);
    let det = e1.dot(&p);

    // Parallel ray or zero-area triangle; the threshold is relative so
    // that tiny but valid triangles still intersect.
    let scale = e1.norm() * e2.norm();
    if !(det.abs() > 1e-12 * scale) {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&e1);
    let v = d.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    if !(t >= 0.0) || !t.is_finite() {
        return None;
    }

    Some(TriangleHit {
        t,
        u,
        v,
        backface: det < 0.0,
    })
}
