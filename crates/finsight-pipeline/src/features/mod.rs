//! Feature derivation
//!
//! Turns a raw [`PriceSeries`] into a [`FeatureTable`] of daily returns and
//! trailing-window statistics. Rows whose window is not yet full are left
//! out, so every surviving row has every column populated.

pub mod preprocess;

pub use preprocess::{MissingValueStrategy, normalize_min_max};

use crate::config::{ConfigError, FeatureConfig};
use crate::data::{PriceBar, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{SimpleMovingAverage, StandardDeviation};
use tracing::warn;

/// A price bar with its derived columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Fractional change of close against the previous row
    pub daily_return: f64,
    pub rolling_mean: f64,
    /// Sample standard deviation of closes over the window
    pub rolling_std: f64,
    /// Simple-average RSI, present when the deriver has an RSI period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
}

impl FeatureRow {
    fn is_finite(&self) -> bool {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.daily_return,
            self.rolling_mean,
            self.rolling_std,
        ]
        .iter()
        .chain(self.rsi.iter())
        .all(|v| v.is_finite())
    }
}

/// Feature rows for one symbol, in date order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    symbol: String,
    window: usize,
    rsi_period: Option<usize>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn rsi_period(&self) -> Option<usize> {
        self.rsi_period
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Closing prices in date order
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.close).collect()
    }

    /// The most recent `count` rows (all of them if there are fewer)
    pub fn tail(&self, count: usize) -> &[FeatureRow] {
        &self.rows[self.rows.len().saturating_sub(count)..]
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|row| row.date)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Relative strength index over plain rolling means of gains and losses
///
/// Not Wilder's exponential smoothing. Yields NaN until `period` price
/// changes have been seen; a window with no losses reads 100 and a window
/// with no movement at all reads 50.
#[derive(Debug, Clone)]
struct RollingRsi {
    period: usize,
    seen: usize,
    gains: SimpleMovingAverage,
    losses: SimpleMovingAverage,
    previous: Option<f64>,
}

impl RollingRsi {
    fn new(period: usize) -> Result<Self, ta::errors::TaError> {
        Ok(Self {
            period,
            seen: 0,
            gains: SimpleMovingAverage::new(period)?,
            losses: SimpleMovingAverage::new(period)?,
            previous: None,
        })
    }
}

impl Next<f64> for RollingRsi {
    type Output = f64;

    fn next(&mut self, close: f64) -> f64 {
        let Some(previous) = self.previous.replace(close) else {
            return f64::NAN;
        };
        let delta = close - previous;
        let gain = self.gains.next(delta.max(0.0));
        let loss = self.losses.next((-delta).max(0.0));
        self.seen += 1;

        if self.seen < self.period {
            f64::NAN
        } else if loss <= 0.0 {
            if gain <= 0.0 { 50.0 } else { 100.0 }
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        }
    }
}

/// Derives a [`FeatureTable`] from raw prices
///
/// Stateless between calls: every [`derive`](Self::derive) starts from fresh
/// copies of the configured indicators.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    window: usize,
    rsi_period: Option<usize>,
    missing_values: MissingValueStrategy,
    mean: SimpleMovingAverage,
    std_dev: StandardDeviation,
    rsi: Option<RollingRsi>,
}

impl FeatureDeriver {
    pub fn new(
        config: &FeatureConfig,
        missing_values: MissingValueStrategy,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let indicator_error = |e: ta::errors::TaError| ConfigError::Invalid {
            field: "features",
            reason: e.to_string(),
        };

        Ok(Self {
            window: config.window,
            rsi_period: config.rsi_period,
            missing_values,
            mean: SimpleMovingAverage::new(config.window).map_err(indicator_error)?,
            std_dev: StandardDeviation::new(config.window).map_err(indicator_error)?,
            rsi: config
                .rsi_period
                .map(RollingRsi::new)
                .transpose()
                .map_err(indicator_error)?,
        })
    }

    /// Index of the first row that can carry every column
    fn first_complete_row(&self) -> usize {
        (self.window - 1).max(1).max(self.rsi_period.unwrap_or(0))
    }

    /// Fewest input rows that yield at least one feature row
    pub fn min_rows(&self) -> usize {
        self.first_complete_row() + 1
    }

    /// Derive features; too few rows yields an empty table, never an error
    pub fn derive(&self, series: &PriceSeries) -> FeatureTable {
        let bars = self.missing_values.apply(series.bars().to_vec());
        let rows = self.derive_rows(series.symbol(), &bars);

        FeatureTable {
            symbol: series.symbol().to_string(),
            window: self.window,
            rsi_period: self.rsi_period,
            rows,
        }
    }

    fn derive_rows(&self, symbol: &str, bars: &[PriceBar]) -> Vec<FeatureRow> {
        let mut mean = self.mean.clone();
        let mut std_dev = self.std_dev.clone();
        let mut rsi = self.rsi.clone();
        let first = self.first_complete_row();
        // ta's deviation is the population one; rescale to n - 1.
        let bessel = (self.window as f64 / (self.window - 1) as f64).sqrt();

        let mut rows = Vec::with_capacity(bars.len().saturating_sub(first));
        let mut previous_close = None;

        for (index, bar) in bars.iter().enumerate() {
            let rolling_mean = mean.next(bar.close);
            let rolling_std = std_dev.next(bar.close) * bessel;
            let rsi_value = rsi.as_mut().map(|indicator| indicator.next(bar.close));
            let daily_return = previous_close.map_or(f64::NAN, |prev| bar.close / prev - 1.0);
            previous_close = Some(bar.close);

            if index < first {
                continue;
            }

            let row = FeatureRow {
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                daily_return,
                rolling_mean,
                rolling_std,
                rsi: rsi_value,
            };
            if row.is_finite() {
                rows.push(row);
            } else {
                warn!(
                    symbol = %symbol,
                    date = %bar.date,
                    daily_return,
                    rolling_std,
                    "dropping feature row with non-finite values"
                );
            }
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Days::new(i as u64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + i as u64,
            })
            .collect();
        PriceSeries::new("AAPL", bars).unwrap()
    }

    fn deriver(window: usize) -> FeatureDeriver {
        let config = FeatureConfig {
            window,
            rsi_period: None,
        };
        FeatureDeriver::new(&config, MissingValueStrategy::Drop).unwrap()
    }

    #[test]
    fn test_drops_incomplete_windows() {
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + f64::from(i) * 0.1).collect();
        let table = deriver(20).derive(&series(&closes));

        assert_eq!(table.len(), 231);
        assert_eq!(table.rows()[0].date, NaiveDate::from_ymd_opt(2023, 1, 21).unwrap());
        assert!(table.rows().iter().all(FeatureRow::is_finite));
    }

    #[test]
    fn test_rolling_statistics() {
        let table = deriver(3).derive(&series(&[1.0, 2.0, 3.0, 4.0]));

        assert_eq!(table.len(), 2);
        let row = &table.rows()[0];
        assert!((row.rolling_mean - 2.0).abs() < 1e-9);
        assert!((row.rolling_std - 1.0).abs() < 1e-9);
        assert!((row.daily_return - 0.5).abs() < 1e-9);

        let last = &table.rows()[1];
        assert!((last.rolling_mean - 3.0).abs() < 1e-9);
        assert!((last.daily_return - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_gives_empty_table() {
        let d = deriver(20);
        assert!(d.derive(&series(&[100.0])).is_empty());
        assert!(d.derive(&series(&[100.0; 19])).is_empty());
        assert_eq!(d.derive(&series(&[100.0; 20])).len(), 1);
        assert_eq!(d.min_rows(), 20);
    }

    #[test]
    fn test_derive_is_pure() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + (f64::from(i) * 0.7).sin()).collect();
        let input = series(&closes);
        let d = deriver(10);
        assert_eq!(d.derive(&input), d.derive(&input));
    }

    #[test]
    fn test_rsi_column() {
        let config = FeatureConfig {
            window: 5,
            rsi_period: Some(14),
        };
        let d = FeatureDeriver::new(&config, MissingValueStrategy::Drop).unwrap();
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + f64::from(i % 4)).collect();
        let table = d.derive(&series(&closes));

        assert_eq!(d.min_rows(), 15);
        assert_eq!(table.len(), 16);
        assert!(table.rows().iter().all(|row| {
            row.rsi.is_some_and(|v| (0.0..=100.0).contains(&v))
        }));
    }

    #[test]
    fn test_rsi_uses_simple_rolling_means() {
        let config = FeatureConfig {
            window: 2,
            rsi_period: Some(2),
        };
        let d = FeatureDeriver::new(&config, MissingValueStrategy::Drop).unwrap();
        // Changes: +1, -1, +2
        let table = d.derive(&series(&[10.0, 11.0, 10.0, 12.0]));

        assert_eq!(table.len(), 2);
        // gains (1, 0) / losses (0, 1) average to 0.5 each
        assert!((table.rows()[0].rsi.unwrap() - 50.0).abs() < 1e-9);
        // gains (0, 2) = 1.0, losses (1, 0) = 0.5, rs = 2
        assert!((table.rows()[1].rsi.unwrap() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_edge_values() {
        let config = FeatureConfig {
            window: 3,
            rsi_period: Some(3),
        };
        let d = FeatureDeriver::new(&config, MissingValueStrategy::Drop).unwrap();

        let rising = d.derive(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert!(rising.rows().iter().all(|row| row.rsi == Some(100.0)));

        let flat = d.derive(&series(&[7.0; 6]));
        assert!(flat.rows().iter().all(|row| row.rsi == Some(50.0)));
    }

    #[test]
    fn test_zero_close_drops_following_row() {
        let closes = [10.0, 11.0, 12.0, 0.0, 13.0, 14.0, 15.0];
        let table = deriver(2).derive(&series(&closes));

        // The row after the zero close has an infinite return and is skipped
        let dates: Vec<NaiveDate> = table.rows().iter().map(|row| row.date).collect();
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        assert_eq!(table.len(), 5);
        assert!(!dates.contains(&(start + Days::new(4))));
        assert!(dates.contains(&(start + Days::new(3))));
        assert!(dates.contains(&(start + Days::new(5))));
    }

    #[test]
    fn test_tail() {
        let closes: Vec<f64> = (0..40).map(f64::from).map(|v| v + 1.0).collect();
        let table = deriver(20).derive(&series(&closes));
        assert_eq!(table.tail(10).len(), 10);
        assert_eq!(table.tail(10).last(), table.rows().last());
        assert_eq!(table.tail(500).len(), table.len());
    }
}
