//! # Flow Profile Synthesis
//!
//! Deterministic synthetic time series of local temperature and radial flow
//! speed for a cooling, expanding medium:
//!
//! ```text
//! x    = (t - t_min) / (t_max - t_min)          x ∈ [0, 1]
//! T(x) = T0 + ΔT · (1 - x)                      cooling
//! v(x) = expansion_scale · x · (1 - k · x)      bounded radial flow
//! ```
//!
//! A synthesized profile is re-validated before it is returned. Failing that
//! check means the formulas or parameters are broken, not the caller's data,
//! so it surfaces as [`ProfileError::InvalidProfile`].

use serde::Serialize;

use crate::validator::{validate_profile, ValidationReport};

/// Temperature at the end of the time range (GeV)
pub const BASE_TEMPERATURE: f64 = 0.15;

/// Temperature drop over the full time range (GeV)
pub const TEMPERATURE_DROP: f64 = 0.25;

/// Curvature `k` of the flow ramp
pub const FLOW_CURVATURE: f64 = 0.3;

/// Default number of profile steps
pub const DEFAULT_STEPS: usize = 50;

/// Default flow scale
pub const DEFAULT_EXPANSION_SCALE: f64 = 0.35;

/// Errors raised while constructing a flow profile
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Time range is empty, reversed or not finite
    #[error("Invalid time range: t_min = {t_min}, t_max = {t_max}")]
    InvalidTimeRange {
        /// Requested range start
        t_min: f64,
        /// Requested range end
        t_max: f64,
    },

    /// A profile needs at least one step
    #[error("Profile requires at least one step")]
    ZeroSteps,

    /// The generated profile violated the physical rules
    #[error("Flow profile invalid: {}", .0.summary())]
    InvalidProfile(ValidationReport),
}

/// One sample of the flow profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowProfilePoint {
    /// Time
    pub time: f64,
    /// Local temperature (energy units)
    pub temperature: f64,
    /// Radial flow speed, `|v| < 1`
    pub velocity: f64,
}

/// Parameters for [`synthesize_profile`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileParams {
    /// Start of the time range
    pub t_min: f64,
    /// End of the time range
    pub t_max: f64,
    /// Number of intervals; the profile holds `steps + 1` points
    pub steps: usize,
    /// Overall flow strength
    pub expansion_scale: f64,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            t_min: 0.0,
            t_max: 10.0,
            steps: DEFAULT_STEPS,
            expansion_scale: DEFAULT_EXPANSION_SCALE,
        }
    }
}

/// Time-ascending, immutable sequence of profile points
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlowProfile {
    points: Vec<FlowProfilePoint>,
}

impl FlowProfile {
    /// All points, time-ascending
    pub fn points(&self) -> &[FlowProfilePoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the profile has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points whose time lies in `[t_start, t_end]`
    pub fn window(&self, t_start: f64, t_end: f64) -> impl Iterator<Item = &FlowProfilePoint> {
        self.points
            .iter()
            .filter(move |p| p.time >= t_start && p.time <= t_end)
    }

    /// Mean flow speed over the whole profile, 0 for an empty profile
    pub fn mean_velocity(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.velocity).sum::<f64>() / self.points.len() as f64
    }

    /// Temperature column
    pub fn temperatures(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.temperature).collect()
    }

    /// Velocity column
    pub fn velocities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.velocity).collect()
    }
}

/// Generate `steps + 1` evenly spaced profile points over `[t_min, t_max]`.
pub fn synthesize_profile(params: &ProfileParams) -> Result<FlowProfile, ProfileError> {
    let ProfileParams {
        t_min,
        t_max,
        steps,
        expansion_scale,
    } = *params;

    if !(t_min.is_finite() && t_max.is_finite()) || t_max <= t_min {
        return Err(ProfileError::InvalidTimeRange { t_min, t_max });
    }
    if steps == 0 {
        return Err(ProfileError::ZeroSteps);
    }

    let span = t_max - t_min;
    let points: Vec<FlowProfilePoint> = (0..=steps)
        .map(|i| {
            let x = i as f64 / steps as f64;
            FlowProfilePoint {
                time: t_min + span * x,
                temperature: BASE_TEMPERATURE + TEMPERATURE_DROP * (1.0 - x),
                velocity: expansion_scale * x * (1.0 - FLOW_CURVATURE * x),
            }
        })
        .collect();

    let report = validate_profile(&points);
    if !report.is_valid() {
        return Err(ProfileError::InvalidProfile(report));
    }

    Ok(FlowProfile { points })
}
