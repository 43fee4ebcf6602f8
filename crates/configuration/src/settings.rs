use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its `Default` so an empty file (or no file at all)
/// yields a working engine.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub worker: WorkerSettings,
    pub forecast: ForecastSettings,
    pub correlation: CorrelationSettings,
    pub simulation: SimulationSettings,
    pub bandit: BanditSettings,
    pub logging: LoggingSettings,
}

/// Sizing of the background execution context.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Number of tasks allowed to run at once. `0` means one per logical CPU.
    pub workers: usize,
    /// Capacity of the caller-facing result stream.
    pub result_buffer: usize,
}

/// Default smoothing constants and input caps for forecasting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Level smoothing constant.
    pub alpha: f64,
    /// Trend smoothing constant (Holt-Winters only).
    pub beta: f64,
    /// Seasonal smoothing constant (Holt-Winters only).
    pub gamma: f64,
    /// Requested horizons above this are clamped.
    pub max_horizon: usize,
    /// Bounds are floored at this value. Set to `None` for signed metrics.
    pub value_floor: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    /// Pairs with `|r|` strictly above this are counted as graph edges.
    pub edge_threshold: f64,
    /// Inputs larger than this are rejected instead of computed.
    pub max_observations: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Scenario requests with more interventions than this are rejected.
    pub max_interventions: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BanditSettings {
    /// Exploration constant `c` in the UCB1 score `avg + c * sqrt(ln N / n)`.
    pub exploration: f64,
    /// z-score used for the per-arm confidence half-width.
    pub confidence_z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info,engine=debug").
    pub level: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            workers: 0,
            result_buffer: 256,
        }
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.1,
            gamma: 0.1,
            max_horizon: 365,
            value_floor: Some(0.0),
        }
    }
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            edge_threshold: 0.3,
            max_observations: 100_000,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            max_interventions: 1_000,
        }
    }
}

impl Default for BanditSettings {
    fn default() -> Self {
        Self {
            exploration: std::f64::consts::SQRT_2,
            confidence_z: 1.96,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            directory: None,
            file_prefix: "vantage.log".to_string(),
        }
    }
}

impl WorkerSettings {
    /// The effective worker count after resolving `0` to the CPU count.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

impl Settings {
    /// Rejects values that would make the engines misbehave rather than degrade.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("forecast.alpha", self.forecast.alpha),
            ("forecast.beta", self.forecast.beta),
            ("forecast.gamma", self.forecast.gamma),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        if self.forecast.max_horizon == 0 {
            return Err(ConfigError::ValidationError(
                "forecast.max_horizon must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.correlation.edge_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "correlation.edge_threshold must be in [0, 1), got {}",
                self.correlation.edge_threshold
            )));
        }
        if self.worker.result_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "worker.result_buffer must be at least 1".to_string(),
            ));
        }
        if self.bandit.exploration < 0.0 || self.bandit.confidence_z <= 0.0 {
            return Err(ConfigError::ValidationError(
                "bandit.exploration must be >= 0 and bandit.confidence_z > 0".to_string(),
            ));
        }
        Ok(())
    }
}
