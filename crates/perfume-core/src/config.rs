//! Engine configuration
//!
//! A [`Config`] is fixed once the engine is constructed. It can be built in
//! code, starting from [`Config::default`], or loaded from TOML:
//!
//! ```toml
//! data_consumption = true
//! resource_timing = false
//! logging = true
//! log_prefix = "Perfume.js:"
//! max_measure_time = 15000.0
//! ```
//!
//! The camelCase option names used by the browser bindings (`dataConsumption`,
//! `maxMeasureTime`, ...) are accepted as aliases.

use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PerfumeError;
use crate::idle::DEFAULT_IDLE_TIMEOUT_MS;
use crate::report::AnalyticsPayload;
use crate::sink::{noop_tracker, AnalyticsTracker};

pub const DEFAULT_LOG_PREFIX: &str = "Perfume.js:";
pub const DEFAULT_MAX_MEASURE_TIME: f64 = 15000.0;
pub const DEFAULT_DATA_CONSUMPTION_TIMEOUT_MS: u32 = 15000;

/// Feature toggles, sinks and limits
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Report kilobytes downloaded per initiator type
    #[serde(default, alias = "dataConsumption")]
    pub data_consumption: bool,
    /// Report every resource timing entry
    #[serde(default, alias = "resourceTiming")]
    pub resource_timing: bool,
    /// Report the navigation timing breakdown at startup
    #[serde(default, alias = "navigationTiming")]
    pub navigation_timing: bool,
    /// Report network connection quality at startup
    #[serde(default, alias = "networkInformation")]
    pub network_information: bool,
    /// Write reports to the log sink
    #[serde(default = "default_true")]
    pub logging: bool,
    /// Write warnings to the log sink (requires `logging`)
    #[serde(default = "default_true")]
    pub warning: bool,
    /// Prefix of every log line
    #[serde(default = "default_log_prefix", alias = "logPrefix")]
    pub log_prefix: String,
    /// Durations above this many milliseconds are dropped as noise
    #[serde(default = "default_max_measure_time", alias = "maxMeasureTime")]
    pub max_measure_time: f64,
    /// Ceiling on idle deferral of reports (milliseconds)
    #[serde(default = "default_idle_timeout_ms", alias = "idleTimeout")]
    pub idle_timeout_ms: u32,
    /// Data consumption is reported after this long if no input arrives (milliseconds)
    #[serde(
        default = "default_data_consumption_timeout_ms",
        alias = "dataConsumptionTimeout"
    )]
    pub data_consumption_timeout_ms: u32,
    /// Receives every report that survives filtering and visibility gating
    #[serde(skip, default = "noop_tracker")]
    pub analytics_tracker: AnalyticsTracker,
}

fn default_true() -> bool {
    true
}

fn default_log_prefix() -> String {
    DEFAULT_LOG_PREFIX.to_string()
}

fn default_max_measure_time() -> f64 {
    DEFAULT_MAX_MEASURE_TIME
}

fn default_idle_timeout_ms() -> u32 {
    DEFAULT_IDLE_TIMEOUT_MS
}

fn default_data_consumption_timeout_ms() -> u32 {
    DEFAULT_DATA_CONSUMPTION_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_consumption: false,
            resource_timing: false,
            navigation_timing: false,
            network_information: false,
            logging: true,
            warning: true,
            log_prefix: default_log_prefix(),
            max_measure_time: DEFAULT_MAX_MEASURE_TIME,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            data_consumption_timeout_ms: DEFAULT_DATA_CONSUMPTION_TIMEOUT_MS,
            analytics_tracker: noop_tracker(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// Missing keys take their defaults; the result is [validated](Self::validated).
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse TOML configuration")?;
        Ok(config.validated())
    }

    /// Set the analytics tracker
    pub fn with_analytics_tracker<F>(mut self, tracker: F) -> Self
    where
        F: Fn(&AnalyticsPayload) + 'static,
    {
        self.analytics_tracker = Rc::new(tracker);
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), PerfumeError> {
        if !self.max_measure_time.is_finite() || self.max_measure_time <= 0.0 {
            return Err(PerfumeError::InvalidConfig(format!(
                "max_measure_time must be a positive number of milliseconds, got {}",
                self.max_measure_time
            )));
        }
        Ok(())
    }

    /// Clamp out-of-range values back to their defaults
    pub fn validated(mut self) -> Self {
        if let Err(e) = self.validate() {
            warn!("{}; using {}", e, DEFAULT_MAX_MEASURE_TIME);
            self.max_measure_time = DEFAULT_MAX_MEASURE_TIME;
        }
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_consumption", &self.data_consumption)
            .field("resource_timing", &self.resource_timing)
            .field("navigation_timing", &self.navigation_timing)
            .field("network_information", &self.network_information)
            .field("logging", &self.logging)
            .field("warning", &self.warning)
            .field("log_prefix", &self.log_prefix)
            .field("max_measure_time", &self.max_measure_time)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .field("data_consumption_timeout_ms", &self.data_consumption_timeout_ms)
            .finish_non_exhaustive()
    }
}
