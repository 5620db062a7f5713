//! Price forecasting

pub mod arima;

pub use arima::ArimaForecaster;

use crate::error::ForecastError;
use serde::{Deserialize, Serialize};

/// Lower and upper bound for one forecast period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

impl From<(f64, f64)> for ConfidenceInterval {
    fn from((lower, upper): (f64, f64)) -> Self {
        Self { lower, upper }
    }
}

impl From<ConfidenceInterval> for (f64, f64) {
    fn from(ci: ConfidenceInterval) -> Self {
        (ci.lower, ci.upper)
    }
}

/// Point forecasts with one interval per period
///
/// Construction enforces equal lengths, a positive horizon, finite values and
/// `lower <= upper` for every interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForecastParts")]
pub struct ForecastResult {
    forecast: Vec<f64>,
    confidence_interval: Vec<ConfidenceInterval>,
}

#[derive(Deserialize)]
struct ForecastParts {
    forecast: Vec<f64>,
    confidence_interval: Vec<ConfidenceInterval>,
}

impl TryFrom<ForecastParts> for ForecastResult {
    type Error = ForecastError;

    fn try_from(parts: ForecastParts) -> Result<Self, Self::Error> {
        Self::new(parts.forecast, parts.confidence_interval)
    }
}

impl ForecastResult {
    pub fn new(
        forecast: Vec<f64>,
        confidence_interval: Vec<ConfidenceInterval>,
    ) -> Result<Self, ForecastError> {
        if forecast.is_empty() {
            return Err(ForecastError::InvalidHorizon);
        }
        if forecast.len() != confidence_interval.len() {
            return Err(ForecastError::Inconsistent(format!(
                "{} forecasts but {} intervals",
                forecast.len(),
                confidence_interval.len()
            )));
        }
        for (period, (point, ci)) in forecast.iter().zip(&confidence_interval).enumerate() {
            if !(point.is_finite() && ci.lower.is_finite() && ci.upper.is_finite()) {
                return Err(ForecastError::Inconsistent(format!(
                    "non-finite value in period {}",
                    period + 1
                )));
            }
            if ci.lower > ci.upper {
                return Err(ForecastError::Inconsistent(format!(
                    "lower bound {} above upper bound {} in period {}",
                    ci.lower,
                    ci.upper,
                    period + 1
                )));
            }
        }
        Ok(Self {
            forecast,
            confidence_interval,
        })
    }

    /// Number of forecast periods
    pub fn horizon(&self) -> usize {
        self.forecast.len()
    }

    pub fn forecast(&self) -> &[f64] {
        &self.forecast
    }

    pub fn confidence_interval(&self) -> &[ConfidenceInterval] {
        &self.confidence_interval
    }
}

/// Fits a model to a price series and projects it forward
#[cfg_attr(test, mockall::automock)]
pub trait Forecaster: Send + Sync {
    /// Forecast `horizon` periods past the end of `closing_prices`, in the
    /// same units as the input
    fn forecast(
        &self,
        closing_prices: &[f64],
        horizon: usize,
    ) -> Result<ForecastResult, ForecastError>;
}
