//! Decomposition-based alternate model
//!
//! Splits the series into a moving-average trend with changepoint segments
//! and period-4 seasonal indices, then extrapolates the last segment's
//! slope plus the cycled seasonal component. Selectable instead of the
//! seasonal ARIMA model; shares the same fallback path on failure.

use crate::error::{ForecastError, Result};
use crate::models::{CONFIDENCE_LEVEL, SEASONAL_PERIOD};
use statrs::distribution::{ContinuousCDF, Normal};

/// Minimum points per trend segment when placing changepoints.
const SEGMENT_LEN: usize = 8;
/// Most changepoints the trend is allowed.
const MAX_CHANGEPOINTS: usize = 3;

/// Raw output of a decomposition fit.
#[derive(Debug, Clone)]
pub(crate) struct DecompositionFit {
    pub points: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub changepoints: usize,
    pub aic: f64,
}

/// Fit the decomposition model and forecast `horizon` periods ahead.
pub(crate) fn fit_decomposition(
    values: &[f64],
    seasonal: bool,
    horizon: usize,
) -> Result<DecompositionFit> {
    let n = values.len();
    if n < 2 {
        return Err(ForecastError::ForecastingError(
            "series too short to decompose".to_string(),
        ));
    }

    let trend = moving_average_trend(values);

    // Seasonal indices by period position, on the detrended series.
    let seasonal_active = seasonal && n >= SEASONAL_PERIOD * 2;
    let indices = if seasonal_active {
        let detrended: Vec<f64> = values.iter().zip(&trend).map(|(v, t)| v - t).collect();
        seasonal_indices(&detrended)
    } else {
        [0.0; SEASONAL_PERIOD]
    };

    // Piecewise trend: only the last segment's line extrapolates.
    let changepoints = ((n - 1) / SEGMENT_LEN).min(MAX_CHANGEPOINTS);
    let segment_start = n - last_segment_len(n, changepoints);
    let (slope, last_fit) = linear_fit(&trend[segment_start..])?;

    let residuals: Vec<f64> = (0..n)
        .map(|i| values[i] - trend[i] - indices[i % SEASONAL_PERIOD])
        .collect();
    let sigma2 = residuals.iter().map(|e| e * e).sum::<f64>() / n as f64;
    if !sigma2.is_finite() || !slope.is_finite() || !last_fit.is_finite() {
        return Err(ForecastError::MathError(
            "non-finite decomposition estimate".to_string(),
        ));
    }
    let params = 2 + usize::from(seasonal_active) * SEASONAL_PERIOD;
    let aic = n as f64 * (sigma2 + 1e-12).ln() + 2.0 * params as f64;

    let points: Vec<f64> = (1..=horizon)
        .map(|h| last_fit + slope * h as f64 + indices[(n + h - 1) % SEASONAL_PERIOD])
        .collect();
    if points.iter().any(|p| !p.is_finite()) {
        return Err(ForecastError::MathError(
            "non-finite forecast value".to_string(),
        ));
    }

    let sigma = sigma2.sqrt();
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::MathError(e.to_string()))?;
    let z = normal.inverse_cdf((1.0 + CONFIDENCE_LEVEL) / 2.0);
    let (lower, upper): (Vec<f64>, Vec<f64>) = points
        .iter()
        .enumerate()
        .map(|(h, &p)| {
            let margin = z * sigma * ((h + 1) as f64).sqrt();
            (p - margin, p + margin)
        })
        .unzip();

    Ok(DecompositionFit {
        points,
        lower,
        upper,
        changepoints,
        aic,
    })
}

/// Centered moving average of width `SEASONAL_PERIOD`, edges extended flat.
fn moving_average_trend(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let half = SEASONAL_PERIOD / 2;
    if n <= SEASONAL_PERIOD {
        return values.to_vec();
    }
    let mut trend = vec![0.0; n];
    for i in half..(n - half) {
        let sum: f64 = values[i - half..=i + half].iter().sum();
        trend[i] = sum / (SEASONAL_PERIOD + 1) as f64;
    }
    for i in 0..half {
        trend[i] = trend[half];
    }
    for i in (n - half)..n {
        trend[i] = trend[n - half - 1];
    }
    trend
}

/// Mean detrended value per period position.
fn seasonal_indices(detrended: &[f64]) -> [f64; SEASONAL_PERIOD] {
    let mut indices = [0.0; SEASONAL_PERIOD];
    for (pos, index) in indices.iter_mut().enumerate() {
        let values: Vec<f64> = detrended
            .iter()
            .skip(pos)
            .step_by(SEASONAL_PERIOD)
            .copied()
            .collect();
        if !values.is_empty() {
            *index = values.iter().sum::<f64>() / values.len() as f64;
        }
    }
    indices
}

/// Length of the final trend segment given the changepoint count.
fn last_segment_len(n: usize, changepoints: usize) -> usize {
    let segments = changepoints + 1;
    (n / segments).max(2).min(n)
}

/// Ordinary least squares line through a segment; returns the slope and the
/// fitted value at the segment's last point.
fn linear_fit(segment: &[f64]) -> Result<(f64, f64)> {
    let n = segment.len();
    if n < 2 {
        return Err(ForecastError::ForecastingError(
            "trend segment too short".to_string(),
        ));
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = segment.iter().sum::<f64>() / nf;
    let mut num = 0.0;
    let mut denom = 0.0;
    for (i, &y) in segment.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        denom += dx * dx;
    }
    let slope = if denom > 1e-10 { num / denom } else { 0.0 };
    let last_fit = mean_y + slope * ((nf - 1.0) - mean_x);
    Ok((slope, last_fit))
}
