//! # Confound-Controlled Regression
//!
//! Relates the measurement duration to the fitted effective temperature while
//! statistically controlling for flow strength:
//!
//! ```text
//! T_eff = intercept + β_Δt · Δt + β_expansion · expansion
//! ```
//!
//! The two-predictor least-squares problem is solved in closed form from the
//! 2×2 covariance matrix. Degenerate inputs (fewer than three samples, or a
//! near-singular covariance) return zero slopes and the mean `T_eff` as the
//! intercept. The result is always finite.
//!
//! Every pipeline run is recorded, including runs whose inverse-slope fit fell
//! back. Fallback samples stay in the window so the session reflects what the
//! user looked at, but they carry no measurement and are left out of the fit;
//! [`RegressionSummary::skipped`] counts them.
//!
//! Samples are kept in a [`SampleWindow`], a fixed-capacity ring buffer that
//! evicts the oldest sample first.

use std::collections::VecDeque;

use serde::Serialize;

use crate::fit::FALLBACK_T_EFF;

/// Minimum sample count for a solved regression
pub const MIN_SAMPLES: usize = 3;

/// Covariance determinants at or below this are treated as singular
pub const SINGULAR_THRESHOLD: f64 = 1e-10;

/// Default ring-buffer capacity
pub const DEFAULT_WINDOW: usize = 25;

/// One observation from a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionSample {
    /// Normalized measurement duration
    pub delta_t: f64,
    /// Flow strength covariate
    pub expansion: f64,
    /// Fitted effective temperature
    pub t_eff: f64,
    /// True when `t_eff` is the fallback value rather than a fit
    pub fallback: bool,
}

impl RegressionSample {
    /// Whether the sample can enter the regression
    pub fn is_usable(&self) -> bool {
        !self.fallback
            && self.delta_t.is_finite()
            && self.expansion.is_finite()
            && self.t_eff.is_finite()
    }
}

/// How a regression summary was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionStatus {
    /// Normal equations solved
    Solved,
    /// Fewer than [`MIN_SAMPLES`] usable samples
    InsufficientSamples,
    /// Covariance determinant at or below [`SINGULAR_THRESHOLD`]
    Singular,
}

/// Regression coefficients and fit quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionSummary {
    /// Effect of duration on `T_eff` at fixed flow strength
    pub beta_delta_t: f64,
    /// Effect of flow strength on `T_eff` at fixed duration
    pub beta_expansion: f64,
    /// Intercept
    pub intercept: f64,
    /// RMS fit error over the samples
    pub residual: f64,
    /// Number of samples used
    pub samples: usize,
    /// Samples left out as fallbacks or for non-finite fields
    pub skipped: usize,
    /// How the coefficients were obtained
    pub status: RegressionStatus,
}

impl RegressionSummary {
    /// True unless the normal equations were solved
    pub fn is_degenerate(&self) -> bool {
        self.status != RegressionStatus::Solved
    }

    /// Predicted `T_eff` for a duration and flow strength
    pub fn predict(&self, delta_t: f64, expansion: f64) -> f64 {
        self.intercept + self.beta_delta_t * delta_t + self.beta_expansion * expansion
    }
}

/// Regress `T_eff` on duration and flow strength.
///
/// Fallback samples and samples with non-finite fields are ignored.
pub fn regress(samples: &[RegressionSample]) -> RegressionSummary {
    regress_iter(samples.iter())
}

fn regress_iter<'a, I>(samples: I) -> RegressionSummary
where
    I: Iterator<Item = &'a RegressionSample> + Clone,
{
    let total = samples.clone().count();
    let usable = samples.filter(|s| s.is_usable());

    let mut n = 0usize;
    let (mut sum_dt, mut sum_exp, mut sum_t) = (0.0, 0.0, 0.0);
    let (mut sum_dt2, mut sum_exp2, mut sum_dt_exp) = (0.0, 0.0, 0.0);
    let (mut sum_dt_t, mut sum_exp_t) = (0.0, 0.0);

    for s in usable.clone() {
        n += 1;
        sum_dt += s.delta_t;
        sum_exp += s.expansion;
        sum_t += s.t_eff;
        sum_dt2 += s.delta_t * s.delta_t;
        sum_exp2 += s.expansion * s.expansion;
        sum_dt_exp += s.delta_t * s.expansion;
        sum_dt_t += s.delta_t * s.t_eff;
        sum_exp_t += s.expansion * s.t_eff;
    }

    let skipped = total - n;

    if n == 0 {
        return degenerate(
            FALLBACK_T_EFF,
            0.0,
            0,
            skipped,
            RegressionStatus::InsufficientSamples,
        );
    }

    let nf = n as f64;
    let mean_dt = sum_dt / nf;
    let mean_exp = sum_exp / nf;
    let mean_t = sum_t / nf;

    if n < MIN_SAMPLES {
        let residual = rms(usable, |s| s.t_eff - mean_t, n);
        return degenerate(mean_t, residual, n, skipped, RegressionStatus::InsufficientSamples);
    }

    let var_dt = sum_dt2 / nf - mean_dt * mean_dt;
    let var_exp = sum_exp2 / nf - mean_exp * mean_exp;
    let cov_dt_exp = sum_dt_exp / nf - mean_dt * mean_exp;
    let cov_dt_t = sum_dt_t / nf - mean_dt * mean_t;
    let cov_exp_t = sum_exp_t / nf - mean_exp * mean_t;

    let det = var_dt * var_exp - cov_dt_exp * cov_dt_exp;
    if det.is_nan() || det.abs() <= SINGULAR_THRESHOLD {
        let residual = rms(usable, |s| s.t_eff - mean_t, n);
        return degenerate(mean_t, residual, n, skipped, RegressionStatus::Singular);
    }

    let beta_delta_t = (cov_dt_t * var_exp - cov_exp_t * cov_dt_exp) / det;
    let beta_expansion = (cov_exp_t * var_dt - cov_dt_t * cov_dt_exp) / det;
    let intercept = mean_t - beta_delta_t * mean_dt - beta_expansion * mean_exp;

    let residual = rms(
        usable,
        |s| s.t_eff - (intercept + beta_delta_t * s.delta_t + beta_expansion * s.expansion),
        n,
    );

    RegressionSummary {
        beta_delta_t,
        beta_expansion,
        intercept,
        residual,
        samples: n,
        skipped,
        status: RegressionStatus::Solved,
    }
}

fn degenerate(
    intercept: f64,
    residual: f64,
    samples: usize,
    skipped: usize,
    status: RegressionStatus,
) -> RegressionSummary {
    RegressionSummary {
        beta_delta_t: 0.0,
        beta_expansion: 0.0,
        intercept,
        residual,
        samples,
        skipped,
        status,
    }
}

fn rms<'a, I, F>(samples: I, error: F, n: usize) -> f64
where
    I: Iterator<Item = &'a RegressionSample>,
    F: Fn(&RegressionSample) -> f64,
{
    let sum_sq: f64 = samples.map(|s| error(s).powi(2)).sum();
    (sum_sq / n as f64).sqrt()
}

/// Fixed-capacity ring buffer of regression samples
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<RegressionSample>,
    capacity: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SampleWindow {
    /// Create an empty window holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted oldest sample when full
    pub fn push(&mut self, sample: RegressionSample) -> Option<RegressionSample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &RegressionSample> + Clone {
        self.samples.iter()
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no sample is held
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Regress the samples currently held
    pub fn regress(&self) -> RegressionSummary {
        regress_iter(self.samples.iter())
    }
}

/// Simple one-predictor least-squares fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    /// Slope
    pub slope: f64,
    /// Intercept
    pub intercept: f64,
    /// Coefficient of determination, 0 when `y` is constant
    pub r2: f64,
}

/// Least-squares line through `(x, y)`.
///
/// Empty or mismatched inputs give an all-zero fit.
pub fn linear_regression(x: &[f64], y: &[f64]) -> LinearFit {
    if x.is_empty() || x.len() != y.len() {
        return LinearFit {
            slope: 0.0,
            intercept: 0.0,
            r2: 0.0,
        };
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xx: f64 = x.iter().map(|v| v * v).sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    let slope = if denom != 0.0 {
        (n * sum_xy - sum_x * sum_y) / denom
    } else {
        0.0
    };
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let (ss_tot, ss_res) = x.iter().zip(y).fold((0.0, 0.0), |(tot, res), (&xi, &yi)| {
        let fit = slope * xi + intercept;
        (tot + (yi - mean_y).powi(2), res + (yi - fit).powi(2))
    });
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    LinearFit {
        slope,
        intercept,
        r2,
    }
}

/// Minimum `r²` for a flow/temperature relation to count as consistent
pub const MIN_CAUSAL_R2: f64 = 0.5;

/// Verdict of [`check_expansion_hardening`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalCheck {
    /// True for a positive, reasonably strong relation
    pub consistent: bool,
    /// Fitted slope of `T_eff` against flow speed
    pub slope: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Human-readable verdict
    pub reason: String,
}

/// Check that stronger flow hardens the spectrum (`T_eff` rises with `v`).
///
/// A negative slope points at a spurious relation; a weak `r²` at a data range
/// too narrow to tell.
pub fn check_expansion_hardening(velocities: &[f64], t_effs: &[f64]) -> CausalCheck {
    if velocities.is_empty() || velocities.len() != t_effs.len() {
        return CausalCheck {
            consistent: false,
            slope: 0.0,
            r2: 0.0,
            reason: "Length mismatch".to_string(),
        };
    }

    let fit = linear_regression(velocities, t_effs);
    let positive = fit.slope > 0.0;
    let strong = fit.r2 >= MIN_CAUSAL_R2;

    let reason = match (positive, strong) {
        (true, true) => "Causal relationship consistent (v -> T_eff)",
        (true, false) => "Weak correlation; check data range",
        (false, _) => "Unexpected slope sign; possible spurious relationship",
    };

    CausalCheck {
        consistent: positive && strong,
        slope: fit.slope,
        r2: fit.r2,
        reason: reason.to_string(),
    }
}
