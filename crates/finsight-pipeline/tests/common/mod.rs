//! Offline collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use finsight_pipeline::{
    AnalysisConfig, AnalysisPipeline, ArimaForecaster, DataError, FeatureRow, ForecastError,
    ForecastResult, Forecaster, NarrativeError, Narrator, NoopObserver, PriceBar, PriceSeries,
    PriceSource, SvgChartRenderer,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Seeded residuals in roughly [-1, 1], identical on every run
pub fn residuals(count: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        })
        .collect()
}

/// Deterministic daily bars: a gentle trend, a slow cycle and seeded noise
pub fn synthetic_bars(rows: usize) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let noise = residuals(rows, 42);
    (0..rows)
        .map(|i| {
            let t = i as f64;
            let close = 150.0 + 0.12 * t + 2.5 * (t / 6.0).sin() + 1.5 * noise[i];
            PriceBar {
                date: start + Days::new(i as u64),
                open: close - 0.4,
                high: close + 1.1,
                low: close - 1.2,
                close,
                volume: 50_000_000 + (i as u64 % 7) * 1_000_000,
            }
        })
        .collect()
}

/// Serves the same bars for every request
pub struct StubSource {
    bars: Vec<PriceBar>,
}

impl StubSource {
    pub fn with_rows(rows: usize) -> Self {
        Self {
            bars: synthetic_bars(rows),
        }
    }
}

#[async_trait]
impl PriceSource for StubSource {
    async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        if self.bars.is_empty() {
            return Err(DataError::NoData {
                symbol: ticker.to_string(),
                start,
                end,
            });
        }
        PriceSeries::new(ticker, self.bars.clone())
    }
}

/// Echoes the shape of its inputs, optionally after a delay
pub struct StubNarrator {
    delay: Duration,
}

impl StubNarrator {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Narrator for StubNarrator {
    async fn summarize(
        &self,
        recent_rows: &[FeatureRow],
        forecast_values: &[f64],
    ) -> Result<String, NarrativeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!(
            "Reviewed {} sessions and {} forecast periods.",
            recent_rows.len(),
            forecast_values.len()
        ))
    }
}

/// ARIMA that first blocks its thread, like a long fit would
pub struct SlowForecaster {
    delay: Duration,
    inner: ArimaForecaster,
}

impl SlowForecaster {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: ArimaForecaster::default(),
        }
    }
}

impl Forecaster for SlowForecaster {
    fn forecast(
        &self,
        closing_prices: &[f64],
        horizon: usize,
    ) -> Result<ForecastResult, ForecastError> {
        std::thread::sleep(self.delay);
        self.inner.forecast(closing_prices, horizon)
    }
}

/// Offline pipeline with the real feature, forecast and chart stages
pub fn offline_pipeline(rows: usize, narrator: StubNarrator, output_dir: &Path) -> AnalysisPipeline {
    offline_pipeline_with(rows, narrator, Arc::new(ArimaForecaster::default()), output_dir)
}

/// Offline pipeline with a caller-chosen forecaster
pub fn offline_pipeline_with(
    rows: usize,
    narrator: StubNarrator,
    forecaster: Arc<dyn Forecaster>,
    output_dir: &Path,
) -> AnalysisPipeline {
    let config = AnalysisConfig::builder()
        .output_dir(output_dir)
        .build()
        .unwrap();
    AnalysisPipeline::builder()
        .config(config)
        .price_source(Arc::new(StubSource::with_rows(rows)))
        .narrator(Arc::new(narrator))
        .forecaster(forecaster)
        .chart_renderer(Arc::new(SvgChartRenderer::new(output_dir)))
        .observer(Arc::new(NoopObserver))
        .build()
        .unwrap()
}
