//! SVG charts drawn with plotters

use super::ChartRenderer;
use crate::error::RenderError;
use crate::features::FeatureTable;
use crate::forecast::ForecastResult;
use chrono::{Days, NaiveDate};
use plotters::prelude::*;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_SIZE: (u32, u32) = (1200, 600);

/// Renders `<TICKER>_price_trend.svg` and `<TICKER>_confidence_interval.svg`
#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    output_dir: PathBuf,
    size: (u32, u32),
}

impl SvgChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            size: DEFAULT_SIZE,
        }
    }

    /// Override the pixel size of both charts
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn artifact_path(&self, ticker: &str, suffix: &str) -> PathBuf {
        let stem: String = ticker
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.output_dir.join(format!("{stem}_{suffix}.svg"))
    }
}

fn drawing(err: impl Display) -> RenderError {
    RenderError::Drawing(err.to_string())
}

/// Day offsets from the first observation, used as the x coordinate
fn day_offset(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

fn date_label(origin: NaiveDate, offset: f64) -> String {
    if offset < 0.0 {
        return String::new();
    }
    origin
        .checked_add_days(Days::new(offset.round() as u64))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Value range with a little headroom, never empty
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let pad = ((max - min) * 0.05).max(min.abs() * 0.01).max(1e-6);
    (min - pad, max + pad)
}

impl SvgChartRenderer {
    fn draw_price_trend(
        &self,
        path: &Path,
        origin: NaiveDate,
        history: &[(f64, f64)],
        predicted: &[(f64, f64)],
        ticker: &str,
    ) -> Result<(), RenderError> {
        let x_end = predicted.last().or(history.last()).map_or(1.0, |p| p.0.max(1.0));
        let (y_min, y_max) = padded_range(history.iter().chain(predicted).map(|p| p.1));

        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{ticker} Price Trend and Forecast"), ("sans-serif", 22))
            .margin(16)
            .x_label_area_size(40)
            .y_label_area_size(64)
            .build_cartesian_2d(0.0..x_end, y_min..y_max)
            .map_err(drawing)?;

        let label = |x: &f64| date_label(origin, *x);
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Price")
            .x_labels(8)
            .x_label_formatter(&label)
            .draw()
            .map_err(drawing)?;

        chart
            .draw_series(LineSeries::new(history.iter().copied(), &BLUE))
            .map_err(drawing)?
            .label("Historical Price")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        chart
            .draw_series(LineSeries::new(predicted.iter().copied(), RED.stroke_width(2)))
            .map_err(drawing)?
            .label("Predicted Price")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(drawing)?;

        root.present().map_err(drawing)
    }

    fn draw_confidence_interval(
        &self,
        path: &Path,
        origin: NaiveDate,
        predicted: &[(f64, f64)],
        forecast: &ForecastResult,
        ticker: &str,
    ) -> Result<(), RenderError> {
        let intervals = forecast.confidence_interval();
        let lower: Vec<(f64, f64)> = predicted
            .iter()
            .zip(intervals)
            .map(|(p, ci)| (p.0, ci.lower))
            .collect();
        let upper: Vec<(f64, f64)> = predicted
            .iter()
            .zip(intervals)
            .map(|(p, ci)| (p.0, ci.upper))
            .collect();

        let x_start = predicted.first().map_or(0.0, |p| p.0) - 0.5;
        let x_end = predicted.last().map_or(1.0, |p| p.0) + 0.5;
        let (y_min, y_max) = padded_range(lower.iter().chain(&upper).map(|p| p.1));

        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{ticker} Forecast Confidence Interval"), ("sans-serif", 22))
            .margin(16)
            .x_label_area_size(40)
            .y_label_area_size(64)
            .build_cartesian_2d(x_start..x_end, y_min..y_max)
            .map_err(drawing)?;

        let label = |x: &f64| date_label(origin, *x);
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Price")
            .x_labels(predicted.len().max(2))
            .x_label_formatter(&label)
            .draw()
            .map_err(drawing)?;

        // Upper edge left to right, lower edge back, closes the band.
        let band: Vec<(f64, f64)> = upper.iter().chain(lower.iter().rev()).copied().collect();
        chart
            .draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.3).filled())))
            .map_err(drawing)?
            .label("Confidence Interval")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.3).filled()));

        chart
            .draw_series(LineSeries::new(predicted.iter().copied(), RED.stroke_width(2)))
            .map_err(drawing)?
            .label("Predicted Price")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(drawing)?;

        root.present().map_err(drawing)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(
        &self,
        table: &FeatureTable,
        forecast: &ForecastResult,
        ticker: &str,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let (Some(origin), Some(last)) = (table.rows().first(), table.rows().last()) else {
            return Err(RenderError::EmptyInput(format!("no feature rows for {ticker}")));
        };
        let origin = origin.date;

        let history: Vec<(f64, f64)> = table
            .rows()
            .iter()
            .map(|row| (day_offset(origin, row.date), row.close))
            .collect();
        // Forecast periods fall on the calendar days following the last observation.
        let last_x = day_offset(origin, last.date);
        let predicted: Vec<(f64, f64)> = forecast
            .forecast()
            .iter()
            .enumerate()
            .map(|(i, &value)| (last_x + (i + 1) as f64, value))
            .collect();

        fs::create_dir_all(&self.output_dir)?;

        let trend = self.artifact_path(ticker, "price_trend");
        self.draw_price_trend(&trend, origin, &history, &predicted, ticker)?;

        let band = self.artifact_path(ticker, "confidence_interval");
        self.draw_confidence_interval(&band, origin, &predicted, forecast, ticker)?;

        for path in [&trend, &band] {
            if !path.is_file() {
                return Err(RenderError::Drawing(format!("{} was not written", path.display())));
            }
        }

        debug!(ticker, dir = %self.output_dir.display(), "charts written");
        Ok(vec![trend, band])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::data::{PriceBar, PriceSeries};
    use crate::features::{FeatureDeriver, MissingValueStrategy};
    use crate::forecast::ConfidenceInterval;

    fn table(rows: usize) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = (0..rows)
            .map(|i| {
                let close = 150.0 + (i as f64 * 0.4).sin() * 5.0;
                PriceBar {
                    date: start + Days::new(i as u64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000,
                }
            })
            .collect();
        let series = PriceSeries::new("AAPL", bars).unwrap();
        FeatureDeriver::new(&FeatureConfig::default(), MissingValueStrategy::Drop)
            .unwrap()
            .derive(&series)
    }

    fn forecast() -> ForecastResult {
        let points = vec![151.0, 151.5, 152.0];
        let ci = points
            .iter()
            .enumerate()
            .map(|(i, p)| ConfidenceInterval::new(p - 1.0 - i as f64, p + 1.0 + i as f64))
            .collect();
        ForecastResult::new(points, ci).unwrap()
    }

    #[test]
    fn test_render_writes_two_charts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgChartRenderer::new(dir.path().join("charts")).with_size(800, 400);

        let paths = renderer.render(&table(60), &forecast(), "AAPL").unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("AAPL_price_trend.svg"));
        assert!(paths[1].ends_with("AAPL_confidence_interval.svg"));
        for path in &paths {
            let svg = fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"));
        }
    }

    #[test]
    fn test_render_rejects_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgChartRenderer::new(dir.path());
        let err = renderer.render(&table(5), &forecast(), "AAPL").unwrap_err();
        assert!(matches!(err, RenderError::EmptyInput(_)));
    }

    #[test]
    fn test_unwritable_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let renderer = SvgChartRenderer::new(blocker.join("charts"));
        let err = renderer.render(&table(40), &forecast(), "AAPL").unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn test_date_labels() {
        let origin = NaiveDate::from_ymd_opt(2023, 12, 30).unwrap();
        assert_eq!(date_label(origin, 2.0), "2024-01-01");
        assert_eq!(date_label(origin, -1.0), "");
    }

    #[test]
    fn test_artifact_names_are_path_safe() {
        let renderer = SvgChartRenderer::new("/tmp/out");
        assert_eq!(
            renderer.artifact_path("BRK/B", "price_trend"),
            PathBuf::from("/tmp/out/BRK_B_price_trend.svg")
        );
    }
}
