//! Seasonal ARIMA-style model with an optional exogenous regressor
//!
//! Fits the weekly series in levels after first differencing, with order
//! (1,1,1) and, when enabled, an additive seasonal (1,0,1) term at period
//! 4. Coefficients come from lagged least squares (a Hannan-Rissanen style
//! two-pass for the MA term); they are deliberately not clamped, so
//! near-unit-root series fit without stability or invertibility
//! enforcement. The exogenous promo column enters in differences and its
//! effect is added back over the forecast horizon.

use crate::error::{ForecastError, Result};
use crate::models::{CONFIDENCE_LEVEL, SEASONAL_PERIOD};
use statrs::distribution::{ContinuousCDF, Normal};

/// Denominator guard for the lag regressions.
const EPS: f64 = 1e-10;

/// Raw output of a seasonal-ARIMA fit, before clamping and labelling.
#[derive(Debug, Clone)]
pub(crate) struct SarimaxFit {
    pub points: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub order: (usize, usize, usize),
    pub seasonal_order: Option<(usize, usize, usize, usize)>,
    pub aic: f64,
}

/// Fit the model and forecast `horizon` periods ahead.
///
/// `exog` supplies the aligned historical regressor and its future values;
/// `seasonal` enables the period-4 seasonal term. Numerical failure
/// (degenerate variance, non-finite estimates) is an error so the caller
/// can fall back deterministically.
pub(crate) fn fit_sarimax(
    values: &[f64],
    exog: Option<(&[f64], &[f64])>,
    seasonal: bool,
    horizon: usize,
) -> Result<SarimaxFit> {
    let n = values.len();
    if n < 2 {
        return Err(ForecastError::ForecastingError(
            "series too short to difference".to_string(),
        ));
    }
    if let Some((hist, future)) = exog {
        if hist.len() != n || future.len() != horizon {
            return Err(ForecastError::InvalidParameter(
                "exogenous regressor not aligned to the series".to_string(),
            ));
        }
    }

    // First difference; the model works on the stationary-ish increments.
    let diff: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let m = diff.len();

    // Intercept + AR + MA, plus the optional seasonal and exogenous terms.
    let params = 3 + usize::from(seasonal) + usize::from(exog.is_some());
    if m <= params {
        return Err(ForecastError::ForecastingError(format!(
            "{m} differenced observations cannot identify {params} parameters"
        )));
    }

    // Exogenous effect in differences, removed before the ARMA fit.
    let (beta, adjusted) = match exog {
        Some((hist, _)) => {
            let exog_diff: Vec<f64> = hist.windows(2).map(|w| w[1] - w[0]).collect();
            let denom: f64 = exog_diff.iter().map(|x| x * x).sum();
            let beta = if denom > EPS {
                let num: f64 = diff.iter().zip(&exog_diff).map(|(w, x)| w * x).sum();
                num / denom
            } else {
                0.0
            };
            let adjusted: Vec<f64> = diff
                .iter()
                .zip(&exog_diff)
                .map(|(w, x)| w - beta * x)
                .collect();
            (beta, adjusted)
        }
        None => (0.0, diff),
    };

    let intercept = adjusted.iter().sum::<f64>() / m as f64;
    let centered: Vec<f64> = adjusted.iter().map(|v| v - intercept).collect();

    // AR(1) on the centered increments.
    let phi = lag_coefficient(&centered, 1);

    // Seasonal AR on what AR(1) leaves behind.
    let seasonal_phi = if seasonal {
        let ar_resid: Vec<f64> = centered
            .iter()
            .enumerate()
            .map(|(t, &z)| if t >= 1 { z - phi * centered[t - 1] } else { z })
            .collect();
        lag_coefficient(&ar_resid, SEASONAL_PERIOD)
    } else {
        0.0
    };

    // MA(1): estimate on preliminary residuals, then recompute recursively.
    let preliminary: Vec<f64> = (0..m)
        .map(|t| {
            let mut pred = 0.0;
            if t >= 1 {
                pred += phi * centered[t - 1];
            }
            if t >= SEASONAL_PERIOD {
                pred += seasonal_phi * centered[t - SEASONAL_PERIOD];
            }
            centered[t] - pred
        })
        .collect();
    let theta = lag_coefficient(&preliminary, 1);

    let mut residuals = vec![0.0; m];
    for t in 0..m {
        let mut pred = 0.0;
        if t >= 1 {
            pred += phi * centered[t - 1] + theta * residuals[t - 1];
        }
        if t >= SEASONAL_PERIOD {
            pred += seasonal_phi * centered[t - SEASONAL_PERIOD];
        }
        residuals[t] = centered[t] - pred;
    }

    let sigma2 = residuals.iter().map(|e| e * e).sum::<f64>() / m as f64;
    if !sigma2.is_finite() || ![phi, seasonal_phi, theta, beta].iter().all(|c| c.is_finite()) {
        return Err(ForecastError::MathError(
            "non-finite parameter estimate".to_string(),
        ));
    }

    let aic = m as f64 * (sigma2 + 1e-12).ln() + 2.0 * params as f64;

    // Recursive forecast on the centered increments; future shocks are zero.
    let mut history = centered;
    let mut shock_history = residuals.clone();
    let mut points = Vec::with_capacity(horizon);
    let mut level = values[n - 1];
    let mut prev_exog = exog.map(|(hist, _)| hist[n - 1]);

    for h in 0..horizon {
        let len = history.len();
        let mut pred = phi * history[len - 1] + theta * shock_history[len - 1];
        if seasonal && len >= SEASONAL_PERIOD {
            pred += seasonal_phi * history[len - SEASONAL_PERIOD];
        }
        history.push(pred);
        shock_history.push(0.0);

        let mut increment = pred + intercept;
        if let (Some((_, future)), Some(prev)) = (exog, prev_exog) {
            increment += beta * (future[h] - prev);
            prev_exog = Some(future[h]);
        }
        level += increment;
        points.push(level);
    }

    if points.iter().any(|p| !p.is_finite()) {
        return Err(ForecastError::MathError(
            "non-finite forecast value".to_string(),
        ));
    }

    // Interval from residual spread, widening with the horizon.
    let sigma = sigma2.sqrt();
    let z = normal_quantile((1.0 + CONFIDENCE_LEVEL) / 2.0)?;
    let (lower, upper): (Vec<f64>, Vec<f64>) = points
        .iter()
        .enumerate()
        .map(|(h, &p)| {
            let margin = z * sigma * ((h + 1) as f64).sqrt();
            (p - margin, p + margin)
        })
        .unzip();

    Ok(SarimaxFit {
        points,
        lower,
        upper,
        order: (1, 1, 1),
        seasonal_order: seasonal.then_some((1, 0, 1, SEASONAL_PERIOD)),
        aic,
    })
}

/// Least-squares coefficient of `series[t]` on `series[t - lag]`; zero when
/// the lagged variance degenerates.
fn lag_coefficient(series: &[f64], lag: usize) -> f64 {
    if series.len() <= lag {
        return 0.0;
    }
    let mut num = 0.0;
    let mut denom = 0.0;
    for t in lag..series.len() {
        num += series[t] * series[t - lag];
        denom += series[t - lag] * series[t - lag];
    }
    if denom > EPS {
        num / denom
    } else {
        0.0
    }
}

/// Standard normal quantile.
fn normal_quantile(p: f64) -> Result<f64> {
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| ForecastError::MathError(e.to_string()))?;
    Ok(normal.inverse_cdf(p))
}
