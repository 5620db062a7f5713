//! Configuration for analysis runs

use crate::features::MissingValueStrategy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed validation
    #[error("Configuration error: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A required collaborator was not supplied to a builder
    #[error("Configuration error: missing {0}")]
    Missing(&'static str),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Feature derivation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Trailing window for the rolling mean and standard deviation
    pub window: usize,

    /// Adds an RSI column over this many periods when set, computed from
    /// simple rolling means of gains and losses
    pub rsi_period: Option<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: 20,
            rsi_period: None,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::invalid(
                "feature_window",
                "must be at least 2 for a sample standard deviation",
            ));
        }
        if self.rsi_period == Some(0) {
            return Err(ConfigError::invalid("rsi_period", "must be positive"));
        }
        Ok(())
    }
}

/// Forecaster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Highest autoregressive order tried during model selection
    pub max_ar_order: usize,

    /// Shortest series the forecaster will fit
    pub min_observations: usize,

    /// Coverage of the confidence interval (0.80, 0.90, 0.95 or 0.99)
    pub confidence_level: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_ar_order: 5,
            min_observations: 30,
            confidence_level: 0.95,
        }
    }
}

/// Two-sided standard normal quantiles for the supported confidence levels
const Z_SCORES: [(f64, f64); 4] = [
    (0.80, 1.281_551_565_544_600_4),
    (0.90, 1.644_853_626_951_472_2),
    (0.95, 1.959_963_984_540_054),
    (0.99, 2.575_829_303_548_900_4),
];

impl ForecastConfig {
    /// Standard normal quantile for `confidence_level`, if supported
    pub fn z_score(&self) -> Option<f64> {
        Z_SCORES
            .iter()
            .find(|(level, _)| (level - self.confidence_level).abs() < 1e-9)
            .map(|(_, z)| *z)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.z_score().is_none() {
            return Err(ConfigError::invalid(
                "confidence_level",
                format!("{} is not one of 0.80, 0.90, 0.95, 0.99", self.confidence_level),
            ));
        }
        // One differencing step plus enough rows to estimate an intercept and variance.
        if self.min_observations < 5 {
            return Err(ConfigError::invalid("min_observations", "must be at least 5"));
        }
        Ok(())
    }
}

/// Narrative generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Model identifier passed to the LLM provider
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion length cap, provider default when `None`
    pub max_tokens: Option<usize>,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            model: "llama3-8b-8192".to_string(),
            temperature: 0.3,
            max_tokens: None,
        }
    }
}

impl NarrativeConfig {
    /// Apply `FINSIGHT_LLM_MODEL`, `FINSIGHT_LLM_TEMPERATURE` and `FINSIGHT_LLM_MAX_TOKENS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(model) = lookup("FINSIGHT_LLM_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("FINSIGHT_LLM_TEMPERATURE") {
            config.temperature = raw
                .parse()
                .map_err(|_| ConfigError::invalid("temperature", format!("not a number: {raw}")))?;
        }
        if let Some(raw) = lookup("FINSIGHT_LLM_MAX_TOKENS") {
            config.max_tokens = Some(
                raw.parse()
                    .map_err(|_| ConfigError::invalid("max_tokens", format!("not an integer: {raw}")))?,
            );
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid("temperature", "must be within 0.0..=2.0"));
        }
        Ok(())
    }
}

/// Largest forecast horizon accepted, about a year of daily periods
pub const MAX_HORIZON: usize = 365;

/// Configuration for an analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of future periods to forecast
    pub horizon: usize,

    /// Rows of the feature table handed to narrative generation
    pub recent_rows: usize,

    /// How non-finite raw prices are handled before feature derivation
    pub missing_values: MissingValueStrategy,

    pub features: FeatureConfig,

    pub forecast: ForecastConfig,

    pub narrative: NarrativeConfig,

    /// Directory chart artifacts are written to
    pub output_dir: PathBuf,

    /// Deadline the serving layer applies to a whole run
    pub request_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            horizon: 7,
            recent_rows: 10,
            missing_values: MissingValueStrategy::Drop,
            features: FeatureConfig::default(),
            forecast: ForecastConfig::default(),
            narrative: NarrativeConfig::default(),
            output_dir: PathBuf::from("."),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::invalid("horizon", "must be positive"));
        }
        if self.horizon > MAX_HORIZON {
            return Err(ConfigError::invalid(
                "horizon",
                format!("must be at most {MAX_HORIZON}, got {}", self.horizon),
            ));
        }
        if self.recent_rows == 0 {
            return Err(ConfigError::invalid("recent_rows", "must be positive"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be positive"));
        }
        self.features.validate()?;
        self.forecast.validate()?;
        self.narrative.validate()?;
        Ok(())
    }
}

/// Builder for AnalysisConfig
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    horizon: Option<usize>,
    recent_rows: Option<usize>,
    missing_values: Option<MissingValueStrategy>,
    features: Option<FeatureConfig>,
    forecast: Option<ForecastConfig>,
    narrative: Option<NarrativeConfig>,
    output_dir: Option<PathBuf>,
    request_timeout: Option<Duration>,
}

impl AnalysisConfigBuilder {
    /// Set the forecast horizon
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Set how many recent rows the narrative sees
    pub fn recent_rows(mut self, rows: usize) -> Self {
        self.recent_rows = Some(rows);
        self
    }

    /// Set the raw-data cleaning strategy
    pub fn missing_values(mut self, strategy: MissingValueStrategy) -> Self {
        self.missing_values = Some(strategy);
        self
    }

    /// Set the rolling window length
    pub fn feature_window(mut self, window: usize) -> Self {
        self.features.get_or_insert_with(FeatureConfig::default).window = window;
        self
    }

    /// Add an RSI column
    pub fn rsi_period(mut self, period: usize) -> Self {
        self.features.get_or_insert_with(FeatureConfig::default).rsi_period = Some(period);
        self
    }

    /// Replace the forecaster settings
    pub fn forecast(mut self, forecast: ForecastConfig) -> Self {
        self.forecast = Some(forecast);
        self
    }

    /// Replace the narrative settings
    pub fn narrative(mut self, narrative: NarrativeConfig) -> Self {
        self.narrative = Some(narrative);
        self
    }

    /// Set the chart output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the serving-layer deadline
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let defaults = AnalysisConfig::default();

        let config = AnalysisConfig {
            horizon: self.horizon.unwrap_or(defaults.horizon),
            recent_rows: self.recent_rows.unwrap_or(defaults.recent_rows),
            missing_values: self.missing_values.unwrap_or(defaults.missing_values),
            features: self.features.unwrap_or(defaults.features),
            forecast: self.forecast.unwrap_or(defaults.forecast),
            narrative: self.narrative.unwrap_or(defaults.narrative),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}
