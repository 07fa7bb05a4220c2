//! TOML configuration for the pipeline engine.
//!
//! Every section is optional; missing keys take the interactive defaults.
//!
//! ```toml
//! # flowspec.toml
//! [profile]
//! steps = 50
//! expansion_scale = 0.35
//!
//! [paths]
//! base_count = 200
//!
//! [spectrum]
//! num_bins = 40
//! e_min = 0.1
//! e_max = 1.0
//!
//! [cache]
//! capacity = 200
//! key_precision = 4
//!
//! [regression]
//! window = 25
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_KEY_PRECISION};
use crate::paths::DEFAULT_BASE_COUNT;
use crate::profile::{ProfileParams, DEFAULT_EXPANSION_SCALE, DEFAULT_STEPS};
use crate::regression::DEFAULT_WINDOW;
use crate::spectrum::{SpectrumBinner, DEFAULT_E_MAX, DEFAULT_E_MIN, DEFAULT_NUM_BINS};

/// Errors raised while loading or checking an [`EngineConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not parse into the expected shape
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Flow profile synthesis
    pub profile: ProfileConfig,
    /// Micro-path sampling
    pub paths: PathsConfig,
    /// Spectrum binning
    pub spectrum: SpectrumConfig,
    /// Result cache
    pub cache: CacheConfig,
    /// Regression sample window
    pub regression: RegressionConfig,
}

/// `[profile]` section
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Number of profile intervals
    pub steps: usize,
    /// Flow strength
    pub expansion_scale: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            expansion_scale: DEFAULT_EXPANSION_SCALE,
        }
    }
}

/// `[paths]` section
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Path count at `delta_t_norm = 0.5`
    pub base_count: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_count: DEFAULT_BASE_COUNT,
        }
    }
}

/// `[spectrum]` section
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Number of log-spaced bins
    pub num_bins: usize,
    /// Lower energy bound
    pub e_min: f64,
    /// Upper energy bound
    pub e_max: f64,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            num_bins: DEFAULT_NUM_BINS,
            e_min: DEFAULT_E_MIN,
            e_max: DEFAULT_E_MAX,
        }
    }
}

/// `[cache]` section
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached results
    pub capacity: usize,
    /// Decimal places in cache keys
    pub key_precision: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            key_precision: DEFAULT_KEY_PRECISION,
        }
    }
}

/// `[regression]` section
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Ring-buffer capacity for regression samples
    pub window: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl EngineConfig {
    /// Settings for slider-driven use (the default)
    pub fn interactive() -> Self {
        Self::default()
    }

    /// Finer profile, more paths and twice the bins (slower)
    pub fn high_resolution() -> Self {
        Self {
            profile: ProfileConfig {
                steps: 200,
                ..Default::default()
            },
            paths: PathsConfig { base_count: 400 },
            spectrum: SpectrumConfig {
                num_bins: 80,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile.steps == 0 {
            return Err(invalid("profile.steps must be at least 1"));
        }
        if !self.profile.expansion_scale.is_finite() || self.profile.expansion_scale < 0.0 {
            return Err(invalid(format!(
                "profile.expansion_scale must be finite and non-negative, got {}",
                self.profile.expansion_scale
            )));
        }
        if self.paths.base_count == 0 {
            return Err(invalid("paths.base_count must be at least 1"));
        }
        if self.spectrum.num_bins == 0 {
            return Err(invalid("spectrum.num_bins must be at least 1"));
        }
        let SpectrumConfig { e_min, e_max, .. } = self.spectrum;
        if !(e_min.is_finite() && e_min > 0.0) {
            return Err(invalid(format!("spectrum.e_min must be positive, got {e_min}")));
        }
        if !(e_max.is_finite() && e_max > e_min) {
            return Err(invalid(format!(
                "spectrum.e_max must exceed e_min ({e_min}), got {e_max}"
            )));
        }
        if self.cache.capacity == 0 {
            return Err(invalid("cache.capacity must be at least 1"));
        }
        if self.regression.window == 0 {
            return Err(invalid("regression.window must be at least 1"));
        }
        Ok(())
    }

    /// Profile parameters for the time range `[t_min, t_max]`
    pub fn profile_params(&self, t_min: f64, t_max: f64) -> ProfileParams {
        ProfileParams {
            t_min,
            t_max,
            steps: self.profile.steps,
            expansion_scale: self.profile.expansion_scale,
        }
    }

    /// Spectrum binner for the configured energy window
    pub fn binner(&self) -> SpectrumBinner {
        SpectrumBinner::new(self.spectrum.num_bins, self.spectrum.e_min, self.spectrum.e_max)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
