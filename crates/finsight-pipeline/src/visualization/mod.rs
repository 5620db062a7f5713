//! Chart artifacts

pub mod svg;

pub use svg::SvgChartRenderer;

use crate::error::RenderError;
use crate::features::FeatureTable;
use crate::forecast::ForecastResult;
use std::path::PathBuf;

/// Writes charts for an analysis and reports where they went
#[cfg_attr(test, mockall::automock)]
pub trait ChartRenderer: Send + Sync {
    /// Render the trend chart, then the confidence-interval chart
    ///
    /// Returns the artifact locations in creation order. A renderer that
    /// cannot write both charts must return an error, never a short list.
    fn render(
        &self,
        table: &FeatureTable,
        forecast: &ForecastResult,
        ticker: &str,
    ) -> Result<Vec<PathBuf>, RenderError>;
}
