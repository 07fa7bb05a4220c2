//! # Pipeline Orchestrator
//!
//! Single entry point renderers call after any parameter change.
//!
//! ```text
//! ParameterState ─▶ measurement window ─▶ cache key ─┬─ hit ──▶ Arc<PipelineResult>
//!                                                    │
//!                                                    └─ miss ─▶ synthesize profile
//!                                                               sample micro-paths
//!                                                               bin spectrum
//!                                                               fit T_eff
//!                                                               store + return
//! ```
//!
//! Results are shared as `Arc<PipelineResult>`: a cache hit hands back the same
//! allocation that was stored, and callers only ever get a read-only view.
//!
//! The pipeline also owns the regression session. [`Pipeline::run_and_record`]
//! adds one sample per run to a bounded [`SampleWindow`] and returns the updated
//! confound-controlled regression alongside the result. Runs whose fit fell
//! back are recorded as fallback samples and left out of the regression.
//!
//! ## Example
//!
//! ```rust
//! use flowspec::pipeline::Pipeline;
//! use flowspec::store::ParameterStore;
//!
//! let store = ParameterStore::new();
//! let mut pipeline = Pipeline::default();
//!
//! let result = pipeline.run(&store.state())?;
//! assert!(result.t_start < result.t_end);
//! assert!(result.t_eff() > 0.0);
//! # Ok::<(), flowspec::pipeline::PipelineError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::PipelineCache;
use crate::config::EngineConfig;
use crate::fit::{fit_effective_temperature, SlopeFit};
use crate::paths::{sample_paths, MicroPath};
use crate::profile::{synthesize_profile, FlowProfile, ProfileError};
use crate::regression::{RegressionSample, RegressionSummary, SampleWindow};
use crate::spectrum::{Spectrum, SpectrumBinner};
use crate::store::ParameterState;

/// Smallest measurement window as a fraction of the time span
pub const MIN_WINDOW_FRACTION: f64 = 0.01;

/// Errors raised by the pipeline and its worker
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Flow profile construction failed
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// The background worker thread could not be started
    #[error("Failed to spawn pipeline worker: {0}")]
    WorkerSpawn(String),

    /// The background worker is gone or was already finished
    #[error("Pipeline worker disconnected")]
    WorkerDisconnected,

    /// The background worker panicked
    #[error("Pipeline worker thread panicked")]
    WorkerPanicked,
}

/// Output of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    /// Synthesized profile over the full time range
    pub flow_profile: FlowProfile,
    /// Measurement window start
    pub t_start: f64,
    /// Measurement window end
    pub t_end: f64,
    /// Measurement window length
    pub window_size: f64,
    /// Sampled emission directions
    pub micro_paths: Vec<MicroPath>,
    /// Binned photon spectrum
    pub spectrum: Spectrum,
    /// Inverse-slope fit of the spectrum
    pub fit: SlopeFit,
}

impl PipelineResult {
    /// Fitted effective temperature (fallback value if the fit degenerated)
    pub fn t_eff(&self) -> f64 {
        self.fit.t_eff()
    }

    /// Fitted slope (fallback value if the fit degenerated)
    pub fn slope(&self) -> f64 {
        self.fit.slope()
    }

    /// Mean flow speed inside the measurement window.
    ///
    /// Falls back to the whole-profile mean when the window holds no points.
    pub fn window_mean_velocity(&self) -> f64 {
        let (sum, count) = self
            .flow_profile
            .window(self.t_start, self.t_end)
            .fold((0.0, 0usize), |(sum, count), p| (sum + p.velocity, count + 1));
        if count == 0 {
            self.flow_profile.mean_velocity()
        } else {
            sum / count as f64
        }
    }

    /// JSON snapshot for external renderers
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Derive `(t_start, t_end, window_size)` from the normalized state.
///
/// `window_center` and `delta_t_norm` are clamped to `[0, 1]` first (a NaN
/// center means the middle, a NaN duration the smallest window). The window is
/// at least 1% of the span and at most the full span, and always lies inside
/// `[t_min, t_max]`.
pub fn measurement_window(state: &ParameterState) -> (f64, f64, f64) {
    let center = if state.window_center.is_nan() {
        0.5
    } else {
        state.window_center.clamp(0.0, 1.0)
    };
    let duration = if state.delta_t_norm.is_nan() {
        0.0
    } else {
        state.delta_t_norm.clamp(0.0, 1.0)
    };

    let span = state.t_max - state.t_min;
    let window_size = (duration * span)
        .max(MIN_WINDOW_FRACTION * span)
        .min(span);
    let t_start = state
        .t_min
        .max(state.t_min + span * center - window_size / 2.0);
    let t_end = state.t_max.min(t_start + window_size);
    (t_start, t_end, window_size)
}

/// Counters accumulated over the life of a [`Pipeline`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Calls to [`Pipeline::run`]
    pub runs: usize,
    /// Runs answered from the cache
    pub cache_hits: usize,
    /// Runs that executed the full computation
    pub cache_misses: usize,
    /// Spectra produced by the binner
    pub spectra_binned: usize,
    /// Samples added to the regression window
    pub samples_recorded: usize,
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ran {} times ({} cache hits, {} misses), binned {} spectra, recorded {} samples",
            self.runs,
            self.cache_hits,
            self.cache_misses,
            self.spectra_binned,
            self.samples_recorded
        )
    }
}

/// Result of [`Pipeline::run_and_record`]
#[derive(Debug, Clone)]
pub struct PipelineUpdate {
    /// State the result was computed for
    pub state: ParameterState,
    /// Pipeline output
    pub result: Arc<PipelineResult>,
    /// Regression over the sample window after this run
    pub regression: RegressionSummary,
}

/// Cached profile → spectrum → fit pipeline plus the regression session
#[derive(Debug)]
pub struct Pipeline {
    config: EngineConfig,
    binner: SpectrumBinner,
    cache: PipelineCache,
    samples: SampleWindow,
    stats: PipelineStats,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Pipeline {
    /// Create a pipeline from a configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            binner: config.binner(),
            cache: PipelineCache::new(config.cache.capacity, config.cache.key_precision),
            samples: SampleWindow::new(config.regression.window),
            stats: PipelineStats::default(),
            config,
        }
    }

    /// Compute, or fetch from the cache, the result for `state`.
    pub fn run(&mut self, state: &ParameterState) -> Result<Arc<PipelineResult>, PipelineError> {
        self.stats.runs += 1;

        let (t_start, t_end, window_size) = measurement_window(state);
        let key = self
            .cache
            .key(state.delta_t_norm, t_start, t_end, state.model_mode);

        if let Some(hit) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            log::debug!("Pipeline cache hit for {}", key);
            return Ok(hit);
        }
        self.stats.cache_misses += 1;
        log::debug!("Pipeline cache miss for {}", key);

        let params = self.config.profile_params(state.t_min, state.t_max);
        let flow_profile = synthesize_profile(&params)?;
        let micro_paths = sample_paths(state.delta_t_norm, self.config.paths.base_count);
        let spectrum = self
            .binner
            .bin(&flow_profile, t_start, t_end, &micro_paths);
        self.stats.spectra_binned += 1;
        let fit = fit_effective_temperature(&spectrum.bin_centers, &spectrum.counts);

        let result = Arc::new(PipelineResult {
            flow_profile,
            t_start,
            t_end,
            window_size,
            micro_paths,
            spectrum,
            fit,
        });
        self.cache.set(key, Arc::clone(&result));
        Ok(result)
    }

    /// Run the pipeline and add one sample to the regression window.
    ///
    /// A run whose fit fell back is still recorded, flagged as a fallback so
    /// the regression leaves it out.
    pub fn run_and_record(
        &mut self,
        state: &ParameterState,
    ) -> Result<PipelineUpdate, PipelineError> {
        let result = self.run(state)?;

        self.samples.push(RegressionSample {
            delta_t: state.delta_t_norm,
            expansion: result.window_mean_velocity(),
            t_eff: result.t_eff(),
            fallback: result.fit.is_fallback(),
        });
        self.stats.samples_recorded += 1;

        Ok(PipelineUpdate {
            state: *state,
            regression: self.samples.regress(),
            result,
        })
    }

    /// Confound-controlled regression over the current sample window
    pub fn regression(&self) -> RegressionSummary {
        self.samples.regress()
    }

    /// Recorded regression samples, oldest first
    pub fn samples(&self) -> &SampleWindow {
        &self.samples
    }

    /// Drop all recorded regression samples
    pub fn clear_samples(&mut self) {
        self.samples.clear();
    }

    /// Counters since construction
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// The result cache
    pub fn cache(&self) -> &PipelineCache {
        &self.cache
    }

    /// The active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::FALLBACK_T_EFF;
    use crate::regression::RegressionStatus;

    fn state(delta_t_norm: f64, window_center: f64) -> ParameterState {
        ParameterState {
            delta_t_norm,
            window_center,
            ..Default::default()
        }
    }

    #[test]
    fn test_measurement_window_default() {
        let (t_start, t_end, size) = measurement_window(&ParameterState::default());
        assert!((size - 5.0).abs() < 1e-12);
        assert!((t_start - 2.5).abs() < 1e-12);
        assert!((t_end - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_measurement_window_edges() {
        let (t_start, t_end, _) = measurement_window(&state(0.5, 0.0));
        assert_eq!(t_start, 0.0);
        assert!((t_end - 5.0).abs() < 1e-12);

        let (t_start, t_end, _) = measurement_window(&state(0.5, 1.0));
        assert!((t_start - 7.5).abs() < 1e-12);
        assert_eq!(t_end, 10.0);
        assert!(t_start < t_end);
    }

    #[test]
    fn test_measurement_window_size_limits() {
        let (t_start, t_end, size) = measurement_window(&state(0.0, 0.5));
        assert!((size - 0.1).abs() < 1e-12);
        assert!(t_end > t_start);

        let (t_start, t_end, size) = measurement_window(&state(3.0, 0.5));
        assert_eq!(size, 10.0);
        assert_eq!(t_start, 0.0);
        assert_eq!(t_end, 10.0);
    }

    #[test]
    fn test_run_default_state() {
        let mut pipeline = Pipeline::default();
        let result = pipeline.run(&ParameterState::default()).unwrap();

        assert!(result.t_start < result.t_end);
        assert_eq!(result.spectrum.num_bins(), 40);
        assert!(result.spectrum.total() > 0.0);
        assert!(result.t_eff() > 0.0);
        assert_eq!(result.flow_profile.len(), 51);
        assert_eq!(result.micro_paths.len(), 200);
    }

    #[test]
    fn test_cache_hit_returns_same_result() {
        let mut pipeline = Pipeline::default();
        let first = pipeline.run(&ParameterState::default()).unwrap();
        let again = pipeline
            .run(&ParameterState {
                delta_t_norm: 0.5000001,
                ..Default::default()
            })
            .unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        let stats = pipeline.stats();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.spectra_binned, 1);
    }

    #[test]
    fn test_model_mode_is_part_of_the_key() {
        let mut pipeline = Pipeline::default();
        let a = pipeline.run(&ParameterState::default()).unwrap();
        let b = pipeline
            .run(&ParameterState {
                model_mode: false,
                ..Default::default()
            })
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.spectrum, b.spectrum);
        assert_eq!(pipeline.stats().cache_misses, 2);
    }

    #[test]
    fn test_invalid_time_range_is_an_error() {
        let mut pipeline = Pipeline::default();
        let err = pipeline
            .run(&ParameterState {
                t_min: 5.0,
                t_max: 5.0,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PipelineError::Profile(ProfileError::InvalidTimeRange { .. })));
    }

    #[test]
    fn test_measurement_window_clamps_out_of_range_state() {
        let (t_start, t_end, _) = measurement_window(&state(0.5, 1.5));
        assert_eq!((t_start, t_end), (7.5, 10.0));

        let (t_start, t_end, _) = measurement_window(&state(0.5, -0.5));
        assert_eq!((t_start, t_end), (0.0, 5.0));

        let (_, _, size) = measurement_window(&state(-1.0, 0.5));
        assert!((size - 0.1).abs() < 1e-12);

        let middle = measurement_window(&ParameterState::default());
        assert_eq!(measurement_window(&state(0.5, f64::NAN)), middle);
    }

    #[test]
    fn test_run_and_record() {
        let mut pipeline = Pipeline::default();
        let fitted = [(0.1, 0.3), (0.2, 0.4), (0.15, 0.65), (0.05, 0.9)];

        for (i, &(dt, center)) in fitted.iter().enumerate() {
            let update = pipeline.run_and_record(&state(dt, center)).unwrap();
            assert!(!update.result.fit.is_fallback(), "state {dt} {center}");
            assert_eq!(update.regression.samples, i + 1);
            assert_eq!(update.regression.skipped, 0);
        }

        let summary = pipeline.regression();
        assert_eq!(summary.status, RegressionStatus::Solved);
        assert!(summary.beta_delta_t.is_finite());
        assert!(summary.beta_expansion.is_finite());
        assert!(summary.residual.is_finite());

        let held: Vec<RegressionSample> = pipeline.samples().iter().copied().collect();
        assert_eq!(held.len(), 4);
        assert_eq!(pipeline.stats().samples_recorded, 4);
        for (sample, &(dt, _)) in held.iter().zip(&fitted) {
            assert_eq!(sample.delta_t, dt);
            assert!(!sample.fallback);
            assert!(sample.t_eff > 0.0 && sample.t_eff < 1.0);
            assert!(sample.expansion > 0.0);
        }
    }

    #[test]
    fn test_fallback_run_is_recorded_and_skipped() {
        let mut pipeline = Pipeline::default();
        let update = pipeline.run_and_record(&ParameterState::default()).unwrap();

        assert!(update.result.fit.is_fallback());
        assert_eq!(pipeline.samples().len(), 1);
        let sample = pipeline.samples().iter().next().copied().unwrap();
        assert!(sample.fallback);
        assert_eq!(sample.t_eff, FALLBACK_T_EFF);

        assert_eq!(update.regression.status, RegressionStatus::InsufficientSamples);
        assert_eq!(update.regression.samples, 0);
        assert_eq!(update.regression.skipped, 1);
        assert_eq!(pipeline.stats().samples_recorded, 1);
    }

    #[test]
    fn test_window_mean_velocity() {
        let mut pipeline = Pipeline::default();
        let early = pipeline.run(&state(0.2, 0.1)).unwrap();
        let late = pipeline.run(&state(0.2, 0.9)).unwrap();
        assert!(early.window_mean_velocity() < late.window_mean_velocity());
    }

    #[test]
    fn test_result_to_json() {
        let mut pipeline = Pipeline::default();
        let result = pipeline.run(&ParameterState::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

        assert_eq!(json["spectrum"]["counts"].as_array().unwrap().len(), 40);
        assert!(json["fit"]["kind"].is_string());
        assert_eq!(json["flow_profile"].as_array().unwrap().len(), 51);
    }

    #[test]
    fn test_stats_display() {
        let stats = PipelineStats {
            runs: 3,
            cache_hits: 1,
            cache_misses: 2,
            spectra_binned: 2,
            samples_recorded: 2,
        };
        assert_eq!(
            stats.to_string(),
            "Ran 3 times (1 cache hits, 2 misses), binned 2 spectra, recorded 2 samples"
        );
    }
}
