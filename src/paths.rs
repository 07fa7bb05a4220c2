//! Angular ensemble of sampling directions ("micro-paths").
//!
//! The ensemble is deterministic in `(duration_norm, base_count)`. Cached
//! pipeline results depend on this: two runs with the same inputs must see the
//! same paths.

use std::f64::consts::PI;

use serde::Serialize;

/// Default ensemble size at `duration_norm = 0.5`
pub const DEFAULT_BASE_COUNT: usize = 200;

/// Smallest ensemble ever generated
pub const MIN_PATHS: usize = 10;

/// Largest ensemble ever generated
pub const MAX_PATHS: usize = 500;

/// One sampled emission direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MicroPath {
    /// Angle relative to the flow direction, in `[0, π)`
    pub theta: f64,
    /// Positive contribution weight
    pub weight: f64,
}

/// Number of paths for a normalized duration:
/// `clamp(round(base_count · (0.5 + duration_norm)), 10, 500)`.
pub fn path_count(duration_norm: f64, base_count: usize) -> usize {
    let d = if duration_norm.is_nan() {
        0.0
    } else {
        duration_norm.clamp(0.0, 1.0)
    };
    let n = (base_count as f64 * (0.5 + d)).round() as usize;
    n.clamp(MIN_PATHS, MAX_PATHS)
}

/// Generate evenly spaced directions over `[0, π)` weighted by `1 + 0.5·sin(2θ)`.
pub fn sample_paths(duration_norm: f64, base_count: usize) -> Vec<MicroPath> {
    let n = path_count(duration_norm, base_count);
    (0..n)
        .map(|i| {
            let theta = PI * (i as f64 / n as f64);
            MicroPath {
                theta,
                weight: 1.0 + 0.5 * (2.0 * theta).sin(),
            }
        })
        .collect()
}
