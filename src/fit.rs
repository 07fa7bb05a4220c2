//! # Inverse-Slope Fitting
//!
//! Recovers an effective temperature from a binned spectrum under the thermal
//! model `dN/dE ∝ exp(−E / T_eff)`: `ln(dN/dE)` is linear in `E` with slope
//! `−1 / T_eff`, found by ordinary least squares.
//!
//! Only the upper 70% of bins (by index) enter the fit; the low-energy region is
//! not representative of the thermal tail. Empty bins have no finite log-yield
//! and are skipped.
//!
//! Insufficient data never fails. It produces [`SlopeFit::Fallback`], which
//! reports `T_eff = 0.2`, `slope = −5` for rendering but must not be read as a
//! measurement.

use serde::Serialize;

/// `T_eff` reported by [`SlopeFit::Fallback`]
pub const FALLBACK_T_EFF: f64 = 0.2;

/// Slope reported by [`SlopeFit::Fallback`]
pub const FALLBACK_SLOPE: f64 = -5.0;

/// Fraction of low-energy bins excluded from the fit
pub const LOW_ENERGY_CUT: f64 = 0.3;

/// Outcome of an inverse-slope fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlopeFit {
    /// A genuine measurement
    Fitted {
        /// Effective temperature, `−1 / slope`
        t_eff: f64,
        /// Fitted slope of `ln(yield)` against energy, always negative
        slope: f64,
        /// Number of bins that entered the fit
        points_used: usize,
    },
    /// Too few usable bins or a non-negative slope
    Fallback,
}

impl SlopeFit {
    /// Effective temperature, [`FALLBACK_T_EFF`] for a fallback
    pub fn t_eff(&self) -> f64 {
        match self {
            SlopeFit::Fitted { t_eff, .. } => *t_eff,
            SlopeFit::Fallback => FALLBACK_T_EFF,
        }
    }

    /// Fitted slope, [`FALLBACK_SLOPE`] for a fallback
    pub fn slope(&self) -> f64 {
        match self {
            SlopeFit::Fitted { slope, .. } => *slope,
            SlopeFit::Fallback => FALLBACK_SLOPE,
        }
    }

    /// True when the fit did not produce a measurement
    pub fn is_fallback(&self) -> bool {
        matches!(self, SlopeFit::Fallback)
    }
}

/// Fit `ln(yield)` against bin center over the upper 70% of bins.
pub fn fit_effective_temperature(bin_centers: &[f64], yields: &[f64]) -> SlopeFit {
    let n = bin_centers.len().min(yields.len());
    let first = (n as f64 * LOW_ENERGY_CUT).floor() as usize;

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut count = 0usize;

    for i in first..n {
        let e = bin_centers[i];
        let log_y = yields[i].ln();
        if !e.is_finite() || !log_y.is_finite() {
            continue;
        }
        sum_x += e;
        sum_y += log_y;
        sum_xy += e * log_y;
        sum_x2 += e * e;
        count += 1;
    }

    if count < 2 {
        log::debug!("Inverse-slope fit: {} usable bins, using fallback", count);
        return SlopeFit::Fallback;
    }

    let c = count as f64;
    let denom = c * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return SlopeFit::Fallback;
    }

    let slope = (c * sum_xy - sum_x * sum_y) / denom;
    if slope.is_nan() || slope >= 0.0 {
        log::debug!("Inverse-slope fit: non-negative slope {}, using fallback", slope);
        return SlopeFit::Fallback;
    }

    SlopeFit::Fitted {
        t_eff: -1.0 / slope,
        slope,
        points_used: count,
    }
}

/// Boltzmann-like yield `exp(−E / T)`, zero for `T <= 0`.
pub fn thermal_yield(energy: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    (-energy / temperature).exp()
}
