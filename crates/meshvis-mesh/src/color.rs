//! Scalar field to vertex color mapping.

/// Map a scalar field onto a gray ramp.
///
/// The smallest finite value maps to black and the largest to white. A
/// constant field (or one without finite values) maps to mid gray. Non-finite
/// entries map to black.
pub fn gray_ramp(values: &[f64]) -> Vec<[u8; 4]> {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;

    values
        .iter()
        .map(|&v| {
            let g = if !v.is_finite() {
                0
            } else if !(range > 0.0) {
                128
            } else {
                (((v - lo) / range) * 255.0).round().clamp(0.0, 255.0) as u8
            };
            [g, g, g, 255]
        })
        .collect()
}
