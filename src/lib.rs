//! # flowspec - Photon Spectra from a Flowing, Cooling Medium
//!
//! `flowspec` computes the observed photon energy spectrum of a relativistically
//! expanding, cooling medium and extracts an apparent ("effective") temperature
//! from it. It is the computational core behind interactive controls: a
//! parameter store feeds a cached pipeline, and a confound-controlled regression
//! relates the measurement duration to the fitted temperature while holding the
//! flow strength fixed.
//!
//! ## Key Features
//!
//! - **Deterministic Pipeline**: profile synthesis, micro-path sampling,
//!   log-binned Doppler-shifted spectra and an inverse-slope fit. Identical
//!   inputs give identical outputs, which is what makes caching sound.
//!
//! - **FIFO Result Cache**: fixed-precision keys so slider jitter below the key
//!   precision returns the stored result.
//!
//! - **Change-Only Notification**: the parameter store calls listeners only
//!   when a setter actually changes the state.
//!
//! - **Tagged Degenerate Results**: thin data yields `SlopeFit::Fallback` or a
//!   degenerate `RegressionStatus`, never `NaN` or a panic.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowspec::prelude::*;
//!
//! let mut store = ParameterStore::new();
//! let mut pipeline = Pipeline::new(EngineConfig::interactive());
//!
//! store.set_window(0.3, 0.4);
//! let update = pipeline.run_and_record(&store.state())?;
//!
//! println!("T_eff = {:.3} GeV", update.result.t_eff());
//! println!("{}", pipeline.stats());
//! # Ok::<(), flowspec::pipeline::PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`kinematics`]: Lorentz and Doppler factors, blue-shifted temperature
//! - [`profile`]: synthetic temperature / flow time series
//! - [`validator`]: physical checks on profile data
//! - [`paths`]: deterministic emission-angle sampling
//! - [`spectrum`]: log-spaced spectrum binning
//! - [`fit`]: inverse-slope temperature fit
//! - [`regression`]: two-predictor regression and sample window
//! - [`cache`]: bounded FIFO result cache
//! - [`store`]: observable parameter state
//! - [`pipeline`]: orchestrator tying the stages together
//! - [`worker`]: pipeline confined to a background thread
//! - [`config`]: TOML configuration

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod config;
pub mod fit;
pub mod kinematics;
pub mod paths;
pub mod pipeline;
pub mod profile;
pub mod regression;
pub mod spectrum;
pub mod store;
pub mod validator;
pub mod worker;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::cache::{CacheKey, PipelineCache};
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::fit::{fit_effective_temperature, thermal_yield, SlopeFit};
    pub use crate::kinematics::{doppler_factor, effective_temperature, lorentz_factor};
    pub use crate::paths::{sample_paths, MicroPath};
    pub use crate::pipeline::{
        measurement_window, Pipeline, PipelineError, PipelineResult, PipelineStats, PipelineUpdate,
    };
    pub use crate::profile::{
        synthesize_profile, FlowProfile, FlowProfilePoint, ProfileError, ProfileParams,
    };
    pub use crate::regression::{
        check_expansion_hardening, regress, RegressionSample, RegressionStatus, RegressionSummary,
        SampleWindow,
    };
    pub use crate::spectrum::{Spectrum, SpectrumBinner};
    pub use crate::store::{ParameterState, ParameterStore, SubscriptionId};
    pub use crate::validator::{validate, validate_profile, ValidationReport};
    pub use crate::worker::PipelineWorker;
}
