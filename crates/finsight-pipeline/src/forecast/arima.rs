//! ARIMA(p, 1, 0) forecaster with AIC order selection
//!
//! The series is differenced once and AR(p) models with an intercept are
//! fitted to the differences by ordinary least squares for every order up to
//! [`ForecastConfig::max_ar_order`]. All candidates are fitted on the same
//! sample so their AIC values are comparable; the lowest AIC wins.
//!
//! Forecasts of the differences are built recursively and integrated back to
//! price level. Interval half-widths are `z * sigma * sqrt(sum psi_j^2)` with
//! the psi-weights of the integrated process, so uncertainty widens with the
//! horizon.

use super::{ConfidenceInterval, ForecastResult, Forecaster};
use crate::config::{ConfigError, ForecastConfig};
use crate::error::ForecastError;
use ndarray::{Array1, Array2};
use tracing::debug;

const PIVOT_EPSILON: f64 = 1e-12;

/// Auto-regressive integrated forecaster
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    max_ar_order: usize,
    min_observations: usize,
    z: f64,
}

impl Default for ArimaForecaster {
    fn default() -> Self {
        let config = ForecastConfig::default();
        Self {
            max_ar_order: config.max_ar_order,
            min_observations: config.min_observations,
            z: config.z_score().unwrap_or(1.959_963_984_540_054),
        }
    }
}

impl ArimaForecaster {
    pub fn new(config: &ForecastConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let z = config.z_score().ok_or(ConfigError::Invalid {
            field: "confidence_level",
            reason: "unsupported level".to_string(),
        })?;
        Ok(Self {
            max_ar_order: config.max_ar_order,
            min_observations: config.min_observations,
            z,
        })
    }
}

/// One fitted AR(p) model on the differenced series
#[derive(Debug, Clone)]
struct ArFit {
    intercept: f64,
    /// phi_1..phi_p
    coefficients: Vec<f64>,
    /// Residual variance, degrees-of-freedom corrected
    sigma2: f64,
    aic: f64,
}

impl ArFit {
    fn order(&self) -> usize {
        self.coefficients.len()
    }
}

impl Forecaster for ArimaForecaster {
    fn forecast(
        &self,
        closing_prices: &[f64],
        horizon: usize,
    ) -> Result<ForecastResult, ForecastError> {
        if horizon == 0 {
            return Err(ForecastError::InvalidHorizon);
        }
        if let Some(index) = closing_prices.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::NonFiniteInput { index });
        }
        if closing_prices.len() < self.min_observations {
            return Err(ForecastError::SeriesTooShort {
                required: self.min_observations,
                actual: closing_prices.len(),
            });
        }

        let diffs: Vec<f64> = closing_prices.windows(2).map(|w| w[1] - w[0]).collect();
        // Keep at least twice as many equations as parameters for every candidate.
        let max_order = self.max_ar_order.min(diffs.len().saturating_sub(2) / 3);

        let fit = select_model(&diffs, max_order)?;
        debug!(
            order = fit.order(),
            aic = fit.aic,
            sigma2 = fit.sigma2,
            observations = closing_prices.len(),
            "selected ARIMA({}, 1, 0)",
            fit.order()
        );

        let last_price = closing_prices[closing_prices.len() - 1];
        let points = integrate(last_price, &forecast_differences(&fit, &diffs, horizon));
        let psi = psi_weights(&fit.coefficients, horizon);

        let mut cumulative = 0.0;
        let intervals: Vec<ConfidenceInterval> = points
            .iter()
            .zip(&psi)
            .map(|(&point, &weight)| {
                cumulative += weight * weight;
                let half_width = self.z * (fit.sigma2 * cumulative).sqrt();
                ConfidenceInterval::new(point - half_width, point + half_width)
            })
            .collect();

        if points.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::NonConvergence(format!(
                "ARIMA({}, 1, 0) produced non-finite forecasts",
                fit.order()
            )));
        }

        ForecastResult::new(points, intervals)
    }
}

/// Fit AR(0..=max_order) on a shared sample and keep the lowest AIC
fn select_model(diffs: &[f64], max_order: usize) -> Result<ArFit, ForecastError> {
    let mut best: Option<ArFit> = None;
    let mut last_failure = None;

    for order in 0..=max_order {
        match fit_ar(diffs, order, max_order) {
            Ok(fit) => {
                if best.as_ref().is_none_or(|b| fit.aic < b.aic) {
                    best = Some(fit);
                }
            }
            Err(reason) => {
                debug!(order, %reason, "AR candidate rejected");
                last_failure = Some(reason);
            }
        }
    }

    best.ok_or_else(|| {
        ForecastError::NonConvergence(
            last_failure.unwrap_or_else(|| "no candidate model".to_string()),
        )
    })
}

/// OLS fit of `d_t = c + sum phi_i d_{t-i}` for `t` in `offset..len`
fn fit_ar(diffs: &[f64], order: usize, offset: usize) -> Result<ArFit, String> {
    let samples = diffs.len() - offset;
    let params = order + 1;
    if samples <= params {
        return Err(format!("{samples} samples for {params} parameters"));
    }

    let design = Array2::from_shape_fn((samples, params), |(row, col)| {
        if col == 0 {
            1.0
        } else {
            diffs[offset + row - col]
        }
    });
    let target = Array1::from_iter(diffs[offset..].iter().copied());

    let normal = design.t().dot(&design);
    let rhs = design.t().dot(&target);
    let beta = solve(normal, rhs).ok_or_else(|| format!("singular normal equations at p={order}"))?;

    let residuals = &target - &design.dot(&beta);
    let rss = residuals.dot(&residuals);
    if !rss.is_finite() {
        return Err(format!("non-finite residuals at p={order}"));
    }

    let n = samples as f64;
    let aic = n * (rss / n).ln() + 2.0 * params as f64;
    let sigma2 = rss / (samples - params) as f64;

    Ok(ArFit {
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
        sigma2,
        aic,
    })
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < PIVOT_EPSILON * scale {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Some(x)
}

fn forecast_differences(fit: &ArFit, diffs: &[f64], horizon: usize) -> Vec<f64> {
    let mut history = diffs.to_vec();
    for _ in 0..horizon {
        let next = fit.intercept
            + fit
                .coefficients
                .iter()
                .enumerate()
                .map(|(lag, phi)| phi * history[history.len() - 1 - lag])
                .sum::<f64>();
        history.push(next);
    }
    history.split_off(diffs.len())
}

fn integrate(last_price: f64, diffs: &[f64]) -> Vec<f64> {
    diffs
        .iter()
        .scan(last_price, |level, d| {
            *level += d;
            Some(*level)
        })
        .collect()
}

/// psi_0..psi_{horizon-1} of `(1 - phi(B))(1 - B) y_t = e_t`
fn psi_weights(phi: &[f64], horizon: usize) -> Vec<f64> {
    // Expand the AR polynomial of the differences into one on the levels.
    let p = phi.len();
    let mut level_phi = vec![0.0; p + 1];
    level_phi[0] = 1.0;
    for (i, &coefficient) in phi.iter().enumerate() {
        level_phi[i] += coefficient;
        level_phi[i + 1] -= coefficient;
    }

    let mut psi = Vec::with_capacity(horizon);
    psi.push(1.0);
    for j in 1..horizon {
        let value = level_phi
            .iter()
            .enumerate()
            .take(j)
            .map(|(i, c)| c * psi[j - 1 - i])
            .sum();
        psi.push(value);
    }
    psi
}
