//! Analysis result

use crate::forecast::ForecastResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a successful run produced
///
/// Built once by the pipeline and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    ticker: String,
    market_insights: String,
    prediction_results: ForecastResult,
    visualization_paths: Vec<PathBuf>,
}

impl AnalysisResult {
    pub(crate) fn new(
        ticker: String,
        market_insights: String,
        prediction_results: ForecastResult,
        visualization_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            ticker,
            market_insights,
            prediction_results,
            visualization_paths,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn market_insights(&self) -> &str {
        &self.market_insights
    }

    pub fn prediction_results(&self) -> &ForecastResult {
        &self.prediction_results
    }

    pub fn visualization_paths(&self) -> &[PathBuf] {
        &self.visualization_paths
    }
}
