//! Raw price cleaning and scaling helpers

use crate::data::PriceBar;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How non-finite price fields are handled before features are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueStrategy {
    /// Remove any bar with a non-finite price
    #[default]
    Drop,
    /// Carry the previous finite value forward
    ForwardFill,
    /// Pull the next finite value backward
    BackwardFill,
    /// Replace with the column mean
    Mean,
    /// Replace with the column median
    Median,
}

impl FromStr for MissingValueStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop" => Ok(Self::Drop),
            "forward_fill" | "ffill" => Ok(Self::ForwardFill),
            "backward_fill" | "bfill" => Ok(Self::BackwardFill),
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(format!("unknown missing-value strategy '{other}'")),
        }
    }
}

type Field = fn(&mut PriceBar) -> &mut f64;

fn open(bar: &mut PriceBar) -> &mut f64 {
    &mut bar.open
}

fn high(bar: &mut PriceBar) -> &mut f64 {
    &mut bar.high
}

fn low(bar: &mut PriceBar) -> &mut f64 {
    &mut bar.low
}

fn close(bar: &mut PriceBar) -> &mut f64 {
    &mut bar.close
}

const PRICE_FIELDS: [Field; 4] = [open, high, low, close];

impl MissingValueStrategy {
    /// Apply the strategy, returning bars that are all finite
    ///
    /// Fill strategies that cannot find a replacement (a leading gap under
    /// forward fill, an all-missing column under mean) fall back to dropping
    /// the affected bars.
    pub fn apply(self, mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
        if bars.iter().all(PriceBar::is_finite) {
            return bars;
        }

        for field in PRICE_FIELDS {
            match self {
                Self::Drop => {}
                Self::ForwardFill => fill_forward(bars.iter_mut(), field),
                Self::BackwardFill => fill_forward(bars.iter_mut().rev(), field),
                Self::Mean => {
                    let values = finite_values(&mut bars, field);
                    if !values.is_empty() {
                        let mean = values.iter().sum::<f64>() / values.len() as f64;
                        fill_constant(&mut bars, field, mean);
                    }
                }
                Self::Median => {
                    let mut values = finite_values(&mut bars, field);
                    if let Some(median) = median(&mut values) {
                        fill_constant(&mut bars, field, median);
                    }
                }
            }
        }

        bars.retain(PriceBar::is_finite);
        bars
    }
}

fn fill_forward<'a>(bars: impl Iterator<Item = &'a mut PriceBar>, field: Field) {
    let mut last = None;
    for bar in bars {
        let value = field(bar);
        if value.is_finite() {
            last = Some(*value);
        } else if let Some(prev) = last {
            *value = prev;
        }
    }
}

fn fill_constant(bars: &mut [PriceBar], field: Field, replacement: f64) {
    for bar in bars {
        let value = field(bar);
        if !value.is_finite() {
            *value = replacement;
        }
    }
}

fn finite_values(bars: &mut [PriceBar], field: Field) -> Vec<f64> {
    bars.iter_mut()
        .map(|bar| *field(bar))
        .filter(|v| v.is_finite())
        .collect()
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Min-max scale `values` into `[0, 1]`; a constant series maps to zeros
pub fn normalize_min_max(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}
