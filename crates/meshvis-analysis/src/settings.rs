//! Analysis modes and their parameters.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dispatch::Strategy;
use crate::error::{AnalysisError, Result};

/// Default number of rays per face.
pub const DEFAULT_RAY_COUNT: u32 = 64;
/// Default obscurance decay distance.
pub const DEFAULT_TAU: f64 = 0.1;
/// Default SDF cone half-angle (radians).
pub const DEFAULT_CONE_ANGLE: f64 = 0.1;
/// Worker count used when running in parallel.
pub const PARALLEL_WORKERS: usize = 4;

/// Central tendency used to reduce SDF hit distances to one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SdfStatistic {
    /// Arithmetic mean of all hit distances.
    Mean,
    /// Median hit distance (mean of the two middle values for even counts).
    #[default]
    Median,
    /// Mean after discarding `fraction` of the hits at each end.
    TrimmedMean {
        /// Share of samples dropped from each end, in `[0, 0.5)`.
        fraction: f64,
    },
}

impl SdfStatistic {
    /// Reduce `distances` (sorted in place). Returns `None` when empty.
    pub fn reduce(&self, distances: &mut [f64]) -> Option<f64> {
        if distances.is_empty() {
            return None;
        }
        distances.sort_by(f64::total_cmp);
        let n = distances.len();
        let value = match *self {
            SdfStatistic::Mean => distances.iter().sum::<f64>() / n as f64,
            SdfStatistic::Median => {
                if n % 2 == 1 {
                    distances[n / 2]
                } else {
                    0.5 * (distances[n / 2 - 1] + distances[n / 2])
                }
            }
            SdfStatistic::TrimmedMean { fraction } => {
                let cut = (((n as f64) * fraction).floor() as usize).min((n - 1) / 2);
                let kept = &distances[cut..n - cut];
                kept.iter().sum::<f64>() / kept.len() as f64
            }
        };
        Some(value)
    }
}

/// The analysis to run, with its mode-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Distance-decayed occlusion: hits contribute `exp(-distance / tau)`.
    Obscurance {
        /// Decay distance; smaller values discount far occluders more.
        #[serde(default = "default_tau")]
        tau: f64,
    },
    /// Fraction of hemisphere rays that hit the mesh.
    AmbientOcclusion,
    /// Shape-diameter function: local thickness measured inside a cone
    /// around the inverted face normal.
    Sdf {
        /// Cone half-angle in radians, in `(0, π/2)`.
        #[serde(default = "default_cone_angle")]
        cone_angle: f64,
        /// How hit distances are combined.
        #[serde(default)]
        statistic: SdfStatistic,
    },
    /// Binary shadow test along one direction: 1 if visible, 0 if occluded.
    DirectionalVisibility {
        /// Direction rays travel in (need not be normalized).
        #[serde(default = "default_direction")]
        direction: [f64; 3],
        /// Half-angle (radians) of the cone rays are jittered in; 0 shoots
        /// every ray along `direction`.
        #[serde(default)]
        jitter: f64,
    },
    /// Detects faces whose normal points into the solid and flips them.
    NormalAnalysis,
}

fn default_tau() -> f64 {
    DEFAULT_TAU
}

fn default_cone_angle() -> f64 {
    DEFAULT_CONE_ANGLE
}

fn default_direction() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

impl AnalysisMode {
    /// Obscurance with the default decay.
    pub fn obscurance() -> Self {
        AnalysisMode::Obscurance { tau: DEFAULT_TAU }
    }

    /// SDF with the default cone and statistic.
    pub fn sdf() -> Self {
        AnalysisMode::Sdf {
            cone_angle: DEFAULT_CONE_ANGLE,
            statistic: SdfStatistic::default(),
        }
    }

    /// Directional visibility along `direction`, without jitter.
    pub fn directional(direction: [f64; 3]) -> Self {
        AnalysisMode::DirectionalVisibility {
            direction,
            jitter: 0.0,
        }
    }

    /// Short snake_case name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisMode::Obscurance { .. } => "obscurance",
            AnalysisMode::AmbientOcclusion => "ambient_occlusion",
            AnalysisMode::Sdf { .. } => "sdf",
            AnalysisMode::DirectionalVisibility { .. } => "directional_visibility",
            AnalysisMode::NormalAnalysis => "normal_analysis",
        }
    }

    /// Whether the result is mapped to vertex colors afterwards.
    pub fn colorizes(&self) -> bool {
        !matches!(self, AnalysisMode::NormalAnalysis)
    }

    /// Check mode parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            AnalysisMode::Obscurance { tau } => {
                if !(tau > 0.0 && tau.is_finite()) {
                    return Err(AnalysisError::InvalidSettings(format!(
                        "tau must be positive and finite, got {tau}"
                    )));
                }
            }
            AnalysisMode::AmbientOcclusion | AnalysisMode::NormalAnalysis => {}
            AnalysisMode::Sdf {
                cone_angle,
                statistic,
            } => {
                if !(cone_angle > 0.0 && cone_angle < FRAC_PI_2) {
                    return Err(AnalysisError::InvalidSettings(format!(
                        "cone_angle must be in (0, π/2), got {cone_angle}"
                    )));
                }
                if let SdfStatistic::TrimmedMean { fraction } = statistic {
                    if !(0.0..0.5).contains(&fraction) {
                        return Err(AnalysisError::InvalidSettings(format!(
                            "trimmed mean fraction must be in [0, 0.5), got {fraction}"
                        )));
                    }
                }
            }
            AnalysisMode::DirectionalVisibility { direction, jitter } => {
                let [x, y, z] = direction;
                let norm = (x * x + y * y + z * z).sqrt();
                if !(norm > 0.0 && norm.is_finite()) {
                    return Err(AnalysisError::InvalidSettings(format!(
                        "direction must be a finite non-zero vector, got {direction:?}"
                    )));
                }
                if !(0.0..FRAC_PI_2).contains(&jitter) {
                    return Err(AnalysisError::InvalidSettings(format!(
                        "jitter must be in [0, π/2), got {jitter}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one analysis pass needs besides the mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Analysis mode and its parameters.
    #[serde(flatten)]
    pub mode: AnalysisMode,
    /// Rays cast per face.
    #[serde(default = "default_ray_count")]
    pub ray_count: u32,
    /// Number of face partitions evaluated concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// How partitions are executed.
    #[serde(default)]
    pub strategy: Strategy,
    /// Base seed of the per-face sample sequences.
    #[serde(default)]
    pub seed: u64,
}

fn default_ray_count() -> u32 {
    DEFAULT_RAY_COUNT
}

fn default_workers() -> usize {
    PARALLEL_WORKERS
}

impl AnalysisSettings {
    /// Settings for `mode` with default ray count, four threaded workers,
    /// and seed 0.
    pub fn new(mode: AnalysisMode) -> Self {
        Self {
            mode,
            ray_count: DEFAULT_RAY_COUNT,
            workers: PARALLEL_WORKERS,
            strategy: Strategy::default(),
            seed: 0,
        }
    }

    /// Set the number of rays per face.
    pub fn with_rays(mut self, ray_count: u32) -> Self {
        self.ray_count = ray_count;
        self
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the execution strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run on a single worker.
    pub fn serial(self) -> Self {
        self.with_workers(1)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.ray_count == 0 {
            return Err(AnalysisError::InvalidSettings(
                "ray_count must be positive".into(),
            ));
        }
        if self.workers == 0 {
            return Err(AnalysisError::InvalidSettings(
                "workers must be positive".into(),
            ));
        }
        self.mode.validate()
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::new(AnalysisMode::AmbientOcclusion)
    }
}
