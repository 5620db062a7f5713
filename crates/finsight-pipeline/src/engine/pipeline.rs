//! The analysis orchestrator
//!
//! Runs data access, feature derivation, forecasting, narrative generation
//! and visualization strictly in order, handing each stage only the slice of
//! the previous output it needs. The first failure stops the run and is
//! reported as an [`AnalysisError`]; nothing partial is returned.
//!
//! Forecasting and rendering are CPU and file bound, so they run on the
//! blocking pool. Dropping the run future (a serving deadline, for example)
//! returns control immediately even while one of them is still working.

use super::observer::{PipelineEvent, PipelineObserver, TracingObserver};
use super::request::{AnalysisRequest, RequestError};
use super::result::AnalysisResult;
use crate::config::{AnalysisConfig, ConfigError};
use crate::data::{PriceSource, YahooPriceSource};
use crate::error::{AnalysisError, DataError, ForecastError, NarrativeError, RenderError, Stage};
use crate::features::FeatureDeriver;
use crate::forecast::{ArimaForecaster, Forecaster};
use crate::insights::{LlmNarrator, Narrator};
use crate::visualization::{ChartRenderer, SvgChartRenderer};
use chrono::NaiveDate;
use finsight_llm::LlmProvider;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

/// Failure of [`AnalysisPipeline::run`]
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Sequential analysis pipeline
///
/// Holds only immutable collaborators, so one instance can serve concurrent
/// requests; per-run state lives on the stack of [`run_analysis`](Self::run_analysis).
pub struct AnalysisPipeline {
    source: Arc<dyn PriceSource>,
    deriver: FeatureDeriver,
    forecaster: Arc<dyn Forecaster>,
    narrator: Arc<dyn Narrator>,
    renderer: Arc<dyn ChartRenderer>,
    observer: Arc<dyn PipelineObserver>,
    config: AnalysisConfig,
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("deriver", &self.deriver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Progress bookkeeping for one run
struct Run<'a> {
    id: Uuid,
    observer: &'a dyn PipelineObserver,
}

impl Run<'_> {
    fn begin(&self, stage: Stage) -> Instant {
        self.observer.record(&PipelineEvent::StageStarted {
            run_id: self.id,
            stage,
        });
        Instant::now()
    }

    fn finish<T, E: Display>(
        &self,
        stage: Stage,
        started: Instant,
        outcome: Result<T, E>,
    ) -> Result<T, E> {
        let elapsed = started.elapsed();
        let event = match &outcome {
            Ok(_) => PipelineEvent::StageCompleted {
                run_id: self.id,
                stage,
                elapsed,
            },
            Err(err) => PipelineEvent::StageFailed {
                run_id: self.id,
                stage,
                elapsed,
                error: err.to_string(),
            },
        };
        self.observer.record(&event);
        outcome
    }
}

impl AnalysisPipeline {
    /// Create a pipeline builder
    pub fn builder() -> AnalysisPipelineBuilder {
        AnalysisPipelineBuilder::default()
    }

    /// Yahoo data, ARIMA forecasts, LLM commentary and SVG charts
    pub fn with_default_stack(
        provider: Arc<dyn LlmProvider>,
        config: AnalysisConfig,
    ) -> Result<Self, ConfigError> {
        Self::builder().config(config).llm_provider(provider).build()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Validate the inputs, then run the analysis
    pub async fn run(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<AnalysisResult, RunError> {
        let request = AnalysisRequest::new(ticker, start_date, end_date)?;
        Ok(self.run_analysis(&request).await?)
    }

    /// Run every stage in order for `request`
    pub async fn run_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let run = Run {
            id: Uuid::new_v4(),
            observer: self.observer.as_ref(),
        };
        let started = Instant::now();
        self.observer.record(&PipelineEvent::RunStarted {
            run_id: run.id,
            ticker: request.ticker().to_string(),
            start_date: request.start_date(),
            end_date: request.end_date(),
        });

        let outcome = self.execute(&run, request).await;

        let elapsed = started.elapsed();
        let ticker = request.ticker().to_string();
        self.observer.record(&match &outcome {
            Ok(_) => PipelineEvent::RunCompleted {
                run_id: run.id,
                ticker,
                elapsed,
            },
            Err(err) => PipelineEvent::RunFailed {
                run_id: run.id,
                ticker,
                kind: err.kind(),
                stage: err.stage(),
                elapsed,
            },
        });
        outcome
    }

    async fn execute(
        &self,
        run: &Run<'_>,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let ticker = request.ticker();

        let t = run.begin(Stage::DataAccess);
        let fetched = self
            .source
            .fetch(ticker, request.start_date(), request.end_date())
            .await
            .and_then(|series| {
                if series.is_empty() {
                    Err(DataError::NoData {
                        symbol: ticker.to_string(),
                        start: request.start_date(),
                        end: request.end_date(),
                    })
                } else {
                    Ok(series)
                }
            });
        let series = run
            .finish(Stage::DataAccess, t, fetched)
            .map_err(|source| AnalysisError::NoData {
                ticker: ticker.to_string(),
                source,
            })?;

        let t = run.begin(Stage::FeatureDerivation);
        let table = self.deriver.derive(&series);
        let derived = if table.is_empty() {
            Err(AnalysisError::InsufficientHistory {
                ticker: ticker.to_string(),
                observations: series.len(),
                required: self.deriver.min_rows(),
            })
        } else {
            Ok(table)
        };
        let table = run.finish(Stage::FeatureDerivation, t, derived)?;

        let t = run.begin(Stage::Forecasting);
        let horizon = self.config.horizon;
        let forecaster = Arc::clone(&self.forecaster);
        let closes = table.closes();
        let forecasted = tokio::task::spawn_blocking(move || forecaster.forecast(&closes, horizon))
            .await
            .unwrap_or_else(|join| Err(ForecastError::Aborted(join.to_string())))
            .and_then(|forecast| {
                if forecast.horizon() == horizon {
                    Ok(forecast)
                } else {
                    Err(ForecastError::Inconsistent(format!(
                        "asked for {horizon} periods, got {}",
                        forecast.horizon()
                    )))
                }
            });
        let forecast = run
            .finish(Stage::Forecasting, t, forecasted)
            .map_err(|source| AnalysisError::ForecastFailure {
                ticker: ticker.to_string(),
                source,
            })?;

        let t = run.begin(Stage::NarrativeGeneration);
        let narrated = self
            .narrator
            .summarize(table.tail(self.config.recent_rows), forecast.forecast())
            .await
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(NarrativeError::EmptyResponse)
                } else {
                    Ok(text)
                }
            });
        let market_insights = run
            .finish(Stage::NarrativeGeneration, t, narrated)
            .map_err(|source| AnalysisError::NarrativeFailure {
                ticker: ticker.to_string(),
                source,
            })?;

        let t = run.begin(Stage::Visualization);
        let renderer = Arc::clone(&self.renderer);
        let charted = forecast.clone();
        let symbol = ticker.to_string();
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&table, &charted, &symbol))
            .await
            .unwrap_or_else(|join| Err(RenderError::Aborted(join.to_string())))
            .and_then(|paths| {
                if paths.is_empty() {
                    Err(RenderError::NoArtifacts)
                } else {
                    Ok(paths)
                }
            });
        let visualization_paths = run
            .finish(Stage::Visualization, t, rendered)
            .map_err(|source| AnalysisError::RenderingFailure {
                ticker: ticker.to_string(),
                source,
            })?;

        Ok(AnalysisResult::new(
            ticker.to_string(),
            market_insights,
            forecast,
            visualization_paths,
        ))
    }
}

/// Builder for [`AnalysisPipeline`]
///
/// Every collaborator except the narrator has a default built from the
/// configuration. Supply either [`narrator`](Self::narrator) or
/// [`llm_provider`](Self::llm_provider).
#[derive(Default)]
pub struct AnalysisPipelineBuilder {
    config: Option<AnalysisConfig>,
    source: Option<Arc<dyn PriceSource>>,
    forecaster: Option<Arc<dyn Forecaster>>,
    narrator: Option<Arc<dyn Narrator>>,
    llm_provider: Option<Arc<dyn LlmProvider>>,
    renderer: Option<Arc<dyn ChartRenderer>>,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl AnalysisPipelineBuilder {
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn forecaster(mut self, forecaster: Arc<dyn Forecaster>) -> Self {
        self.forecaster = Some(forecaster);
        self
    }

    pub fn narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Narrate through an [`LlmNarrator`] over `provider`
    pub fn llm_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm_provider = Some(provider);
        self
    }

    pub fn chart_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<AnalysisPipeline, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let narrator: Arc<dyn Narrator> = match (self.narrator, self.llm_provider) {
            (Some(narrator), _) => narrator,
            (None, Some(provider)) => {
                Arc::new(LlmNarrator::new(provider, config.narrative.clone()))
            }
            (None, None) => return Err(ConfigError::Missing("narrator or LLM provider")),
        };
        let forecaster: Arc<dyn Forecaster> = match self.forecaster {
            Some(forecaster) => forecaster,
            None => Arc::new(ArimaForecaster::new(&config.forecast)?),
        };

        Ok(AnalysisPipeline {
            source: self
                .source
                .unwrap_or_else(|| Arc::new(YahooPriceSource::new())),
            deriver: FeatureDeriver::new(&config.features, config.missing_values)?,
            forecaster,
            narrator,
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(SvgChartRenderer::new(config.output_dir.clone()))),
            observer: self.observer.unwrap_or_else(|| Arc::new(TracingObserver)),
            config,
        })
    }
}
