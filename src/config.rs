//! Configuration management for Fitbot.
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then environment variables prefixed with `FITBOT__` (nested keys are
//! separated by `__`, e.g. `FITBOT__LIMITER__CAPACITY=10`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{FitbotError, Result};

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "FITBOT";
/// Separator between nested keys in environment variable names.
const ENV_SEPARATOR: &str = "__";

/// Main configuration for the Fitbot service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitbotConfig {
    /// Rate limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Bot configuration
    #[serde(default)]
    pub bot: BotConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Token bucket settings shared by every key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum tokens a bucket can hold
    #[serde(default = "default_capacity")]
    pub capacity: f64,

    /// Tokens added per second
    #[serde(default = "default_refill_rate")]
    pub refill_rate: f64,

    /// Multiple of the full-refill time after which an idle bucket is evicted
    #[serde(default = "default_eviction_factor")]
    pub eviction_factor: f64,

    /// How often the background sweeper runs, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_rate: default_refill_rate(),
            eviction_factor: default_eviction_factor(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

// 5 requests per minute
fn default_capacity() -> f64 {
    5.0
}

fn default_refill_rate() -> f64 {
    1.0 / 60.0
}

fn default_eviction_factor() -> f64 {
    2.0
}

fn default_sweep_interval() -> u64 {
    60
}

impl LimiterConfig {
    /// Create a limiter configuration with default eviction settings.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            ..Self::default()
        }
    }

    /// Builder-style: set the eviction factor.
    pub fn eviction_factor(mut self, eviction_factor: f64) -> Self {
        self.eviction_factor = eviction_factor;
        self
    }

    /// Interval between sweeper passes.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate the limiter settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.capacity.is_finite() && self.capacity > 0.0) {
            return Err(FitbotError::Config(format!(
                "capacity must be a positive number, got {}",
                self.capacity
            )));
        }
        if !(self.refill_rate.is_finite() && self.refill_rate > 0.0) {
            return Err(FitbotError::Config(format!(
                "refill_rate must be a positive number, got {}",
                self.refill_rate
            )));
        }
        if !(self.eviction_factor.is_finite() && self.eviction_factor >= 1.0) {
            return Err(FitbotError::Config(format!(
                "eviction_factor must be at least 1.0, got {}",
                self.eviction_factor
            )));
        }
        let idle_secs = self.capacity / self.refill_rate * self.eviction_factor;
        if Duration::try_from_secs_f64(idle_secs).is_err() {
            return Err(FitbotError::Config(format!(
                "capacity / refill_rate * eviction_factor is not a representable duration: {}",
                idle_secs
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(FitbotError::Config(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Path to the plan catalog (YAML)
    pub catalog_path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FitbotConfig {
    /// Load configuration from an optional YAML file and the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::new(path, config::FileFormat::Yaml));
        }

        let config: FitbotConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FitbotConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FitbotError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.limiter.validate()
    }
}
