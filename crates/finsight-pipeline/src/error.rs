//! Error types for the analysis pipeline
//!
//! Each collaborator reports failures in its own error type. The orchestrator
//! maps those, exactly once, into [`AnalysisError`], the single failure
//! channel seen by callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One independently failable step of the pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DataAccess,
    FeatureDerivation,
    Forecasting,
    NarrativeGeneration,
    Visualization,
}

impl Stage {
    /// All stages in the order the orchestrator runs them
    pub const ALL: [Stage; 5] = [
        Stage::DataAccess,
        Stage::FeatureDerivation,
        Stage::Forecasting,
        Stage::NarrativeGeneration,
        Stage::Visualization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataAccess => "data access",
            Self::FeatureDerivation => "feature derivation",
            Self::Forecasting => "forecasting",
            Self::NarrativeGeneration => "narrative generation",
            Self::Visualization => "visualization",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoData,
    InsufficientHistory,
    ForecastFailure,
    NarrativeFailure,
    RenderingFailure,
}

/// Data access errors
#[derive(Debug, Error)]
pub enum DataError {
    /// The resolved symbol and range produced zero observations
    #[error("no price data for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Upstream provider failure (HTTP, parsing, unknown symbol)
    #[error("Yahoo Finance error: {0}")]
    Provider(String),

    /// Observations were not strictly increasing by date
    #[error("price series out of order at {date}")]
    OutOfOrder { date: NaiveDate },

    /// Two observations share a date
    #[error("duplicate observation for {date}")]
    DuplicateDate { date: NaiveDate },
}

/// Forecasting errors
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Not enough observations to fit the model
    #[error("series too short to fit: {actual} observations, need at least {required}")]
    SeriesTooShort { required: usize, actual: usize },

    /// Requested horizon is zero
    #[error("forecast horizon must be positive")]
    InvalidHorizon,

    /// Input contained NaN or infinite values
    #[error("series contains non-finite value at position {index}")]
    NonFiniteInput { index: usize },

    /// No candidate model could be fitted, or the fit produced unusable output
    #[error("model fit did not converge: {0}")]
    NonConvergence(String),

    /// Output violated the forecast shape (lengths, bound ordering)
    #[error("inconsistent forecast: {0}")]
    Inconsistent(String),

    /// The blocking forecast task panicked or was cancelled
    #[error("forecast task aborted: {0}")]
    Aborted(String),
}

/// Narrative generation errors
#[derive(Debug, Error)]
pub enum NarrativeError {
    /// The completion call failed
    #[error("LLM call failed: {0}")]
    Llm(#[from] finsight_llm::LlmError),

    /// The prompt template could not be rendered
    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] minijinja::Error),

    /// The model answered with no text
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

/// Chart rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Output directory or file could not be written
    #[error("chart output error: {0}")]
    Io(#[from] std::io::Error),

    /// The drawing backend failed
    #[error("chart drawing failed: {0}")]
    Drawing(String),

    /// Nothing to plot
    #[error("nothing to plot: {0}")]
    EmptyInput(String),

    /// The renderer reported success but produced no artifacts
    #[error("renderer produced no artifacts")]
    NoArtifacts,

    /// The blocking render task panicked or was cancelled
    #[error("render task aborted: {0}")]
    Aborted(String),
}

/// The uniform failure returned by [`AnalysisPipeline`](crate::AnalysisPipeline)
///
/// Every variant names the ticker and, through [`stage`](Self::stage), the
/// stage that failed; the collaborator error is kept as the source.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis failed for {ticker} at {} stage: {source}", Stage::DataAccess)]
    NoData {
        ticker: String,
        #[source]
        source: DataError,
    },

    #[error(
        "analysis failed for {ticker} at {} stage: insufficient history: {observations} observations, need at least {required}",
        Stage::FeatureDerivation
    )]
    InsufficientHistory {
        ticker: String,
        observations: usize,
        required: usize,
    },

    #[error("analysis failed for {ticker} at {} stage: {source}", Stage::Forecasting)]
    ForecastFailure {
        ticker: String,
        #[source]
        source: ForecastError,
    },

    #[error("analysis failed for {ticker} at {} stage: {source}", Stage::NarrativeGeneration)]
    NarrativeFailure {
        ticker: String,
        #[source]
        source: NarrativeError,
    },

    #[error("analysis failed for {ticker} at {} stage: {source}", Stage::Visualization)]
    RenderingFailure {
        ticker: String,
        #[source]
        source: RenderError,
    },
}

impl AnalysisError {
    /// Failure kind, for callers that branch on the cause
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoData { .. } => ErrorKind::NoData,
            Self::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            Self::ForecastFailure { .. } => ErrorKind::ForecastFailure,
            Self::NarrativeFailure { .. } => ErrorKind::NarrativeFailure,
            Self::RenderingFailure { .. } => ErrorKind::RenderingFailure,
        }
    }

    /// Stage that produced the failure
    pub fn stage(&self) -> Stage {
        match self {
            Self::NoData { .. } => Stage::DataAccess,
            Self::InsufficientHistory { .. } => Stage::FeatureDerivation,
            Self::ForecastFailure { .. } => Stage::Forecasting,
            Self::NarrativeFailure { .. } => Stage::NarrativeGeneration,
            Self::RenderingFailure { .. } => Stage::Visualization,
        }
    }

    /// Ticker the failed run was for
    pub fn ticker(&self) -> &str {
        match self {
            Self::NoData { ticker, .. }
            | Self::InsufficientHistory { ticker, .. }
            | Self::ForecastFailure { ticker, .. }
            | Self::NarrativeFailure { ticker, .. }
            | Self::RenderingFailure { ticker, .. } => ticker,
        }
    }
}
