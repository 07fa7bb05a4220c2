//! # Photon Spectrum Binning
//!
//! Accumulates Doppler-shifted photon energies from every
//! (micro-path, profile point) pair into log-spaced histogram bins.
//!
//! ## Binning Rules
//!
//! - Edges: `edge[i] = e_min · (e_max / e_min)^(i / num_bins)`, strictly increasing
//! - Membership is lower-inclusive: `edge[i] <= E < edge[i + 1]`
//! - Rest-frame energy is `2·T` (thermal peak)
//! - Non-positive Doppler factors are causally excluded and skipped
//! - Energies outside `[e_min, e_max)` are out of window and dropped silently
//! - Each pair deposits `weight / (points · paths)`, so an unrestricted
//!   spectrum sums to the mean path weight

use serde::Serialize;

use crate::kinematics::doppler_factor;
use crate::paths::MicroPath;
use crate::profile::FlowProfile;

/// Ratio of rest-frame photon energy to local temperature
pub const THERMAL_PEAK_FACTOR: f64 = 2.0;

/// Default number of bins
pub const DEFAULT_NUM_BINS: usize = 40;

/// Default lower energy bound (GeV)
pub const DEFAULT_E_MIN: f64 = 0.1;

/// Default upper energy bound (GeV)
pub const DEFAULT_E_MAX: f64 = 1.0;

/// Histogram produced by [`SpectrumBinner::bin`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    /// Log-spaced bin edges, length `num_bins + 1`
    pub bin_edges: Vec<f64>,
    /// Accumulated weight per bin, length `num_bins`, never negative
    pub counts: Vec<f64>,
    /// Geometric bin midpoints, length `num_bins`
    pub bin_centers: Vec<f64>,
}

impl Spectrum {
    /// Number of bins
    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    /// Total deposited weight
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// True when nothing was deposited
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0.0)
    }

    /// Index of the bin containing `energy`, if inside `[e_min, e_max)`.
    ///
    /// Linear scan; the first matching bin wins.
    pub fn bin_index(&self, energy: f64) -> Option<usize> {
        self.bin_edges
            .windows(2)
            .position(|edge| energy >= edge[0] && energy < edge[1])
    }
}

/// Log-spaced binning configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBinner {
    /// Number of bins
    pub num_bins: usize,
    /// Lower edge of the first bin
    pub e_min: f64,
    /// Upper edge of the last bin
    pub e_max: f64,
}

impl Default for SpectrumBinner {
    fn default() -> Self {
        Self {
            num_bins: DEFAULT_NUM_BINS,
            e_min: DEFAULT_E_MIN,
            e_max: DEFAULT_E_MAX,
        }
    }
}

impl SpectrumBinner {
    /// Create a binner over `[e_min, e_max)` with `num_bins` bins
    pub fn new(num_bins: usize, e_min: f64, e_max: f64) -> Self {
        Self {
            num_bins,
            e_min,
            e_max,
        }
    }

    /// Log-spaced edges, length `num_bins + 1`
    pub fn bin_edges(&self) -> Vec<f64> {
        let ratio = self.e_max / self.e_min;
        (0..=self.num_bins)
            .map(|i| self.e_min * ratio.powf(i as f64 / self.num_bins as f64))
            .collect()
    }

    /// A spectrum with the configured edges and nothing deposited
    pub fn empty(&self) -> Spectrum {
        let bin_edges = self.bin_edges();
        let bin_centers = geometric_centers(&bin_edges);
        Spectrum {
            counts: vec![0.0; self.num_bins],
            bin_edges,
            bin_centers,
        }
    }

    /// Accumulate the spectrum of `profile` restricted to `[t_start, t_end]`.
    pub fn bin(
        &self,
        profile: &FlowProfile,
        t_start: f64,
        t_end: f64,
        paths: &[MicroPath],
    ) -> Spectrum {
        let mut spectrum = self.empty();

        let window: Vec<_> = profile.window(t_start, t_end).collect();
        if window.is_empty() || paths.is_empty() {
            return spectrum;
        }

        let norm = (window.len() * paths.len()) as f64;
        for path in paths {
            let cos_theta = path.theta.cos();
            let weight = path.weight / norm;
            for point in &window {
                let factor = doppler_factor(point.velocity, cos_theta);
                if factor.is_nan() || factor <= 0.0 {
                    continue;
                }
                let e_obs = THERMAL_PEAK_FACTOR * point.temperature * factor;
                if let Some(index) = spectrum.bin_index(e_obs) {
                    spectrum.counts[index] += weight;
                }
            }
        }

        spectrum
    }
}

fn geometric_centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|e| (e[0] * e[1]).sqrt()).collect()
}
