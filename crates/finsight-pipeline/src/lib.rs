//! Sequential price analysis pipeline
//!
//! One request runs five stages in a fixed order:
//!
//! - Data access: daily bars from Yahoo Finance ([`YahooPriceSource`])
//! - Feature derivation: returns and trailing-window statistics ([`FeatureDeriver`])
//! - Forecasting: ARIMA with AIC order selection ([`ArimaForecaster`])
//! - Narrative generation: LLM market commentary ([`LlmNarrator`])
//! - Visualization: trend and confidence-interval SVG charts ([`SvgChartRenderer`])
//!
//! [`AnalysisPipeline`] sequences them and turns any stage failure into a
//! single [`AnalysisError`] naming the ticker and stage. The [`server`]
//! module exposes the pipeline over HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use finsight_llm::providers::OpenAICompatProvider;
//! use finsight_pipeline::{AnalysisConfig, AnalysisPipeline, AnalysisRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(OpenAICompatProvider::from_env()?);
//!     let pipeline = AnalysisPipeline::with_default_stack(provider, AnalysisConfig::default())?;
//!
//!     let request = AnalysisRequest::parse("AAPL", "2023-01-01", Some("2023-12-31"))?;
//!     let result = pipeline.run_analysis(&request).await?;
//!     println!("{}", result.market_insights());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod features;
pub mod forecast;
pub mod insights;
pub mod server;
pub mod visualization;

pub use config::{
    AnalysisConfig, AnalysisConfigBuilder, ConfigError, FeatureConfig, ForecastConfig, MAX_HORIZON,
    NarrativeConfig,
};
pub use data::{PriceBar, PriceSeries, PriceSource, YahooPriceSource};
pub use engine::{
    AnalysisPipeline, AnalysisPipelineBuilder, AnalysisRequest, AnalysisResult, NoopObserver,
    PipelineEvent, PipelineObserver, RecordingObserver, RequestError, RunError, TracingObserver,
};
pub use error::{
    AnalysisError, DataError, ErrorKind, ForecastError, NarrativeError, RenderError, Stage,
};
pub use features::{FeatureDeriver, FeatureRow, FeatureTable, MissingValueStrategy};
pub use forecast::{ArimaForecaster, ConfidenceInterval, ForecastResult, Forecaster};
pub use insights::{LlmNarrator, Narrator};
pub use visualization::{ChartRenderer, SvgChartRenderer};
