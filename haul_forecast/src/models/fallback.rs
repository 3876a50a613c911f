//! Deterministic moving-average fallback
//!
//! Runs whenever a statistical fit fails numerically: a trailing-4-period
//! average carried forward with a damped linear trend taken from the last
//! two observations, clamped to ±10% per period. Intervals are ±2 trailing
//! standard deviations, floored at zero.

use tracing::debug;

/// Averaging window.
pub(crate) const FALLBACK_WINDOW: usize = 4;
/// Per-period trend clamp.
const TREND_LIMIT: f64 = 0.1;
/// Trend decay applied across the horizon.
const TREND_DAMPING: f64 = 0.5;

/// Raw output of the fallback forecast.
#[derive(Debug, Clone)]
pub(crate) struct FallbackForecast {
    pub points: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Forecast `horizon` periods from the trailing window of `values`
/// (chronological order). `None` when there is nothing to average.
pub(crate) fn moving_average_fallback(values: &[f64], horizon: usize) -> Option<FallbackForecast> {
    if values.is_empty() {
        return None;
    }

    let tail = &values[values.len().saturating_sub(FALLBACK_WINDOW)..];
    let average = tail.iter().sum::<f64>() / tail.len() as f64;
    let std_dev = if tail.len() > 1 {
        let variance = tail
            .iter()
            .map(|v| (v - average).powi(2))
            .sum::<f64>()
            / (tail.len() - 1) as f64;
        variance.sqrt()
    } else {
        average * 0.1
    };

    // Damped trend from the last two observations, clamped per period.
    let trend = if values.len() >= 2 {
        let prev = values[values.len() - 2];
        let last = values[values.len() - 1];
        if prev != 0.0 {
            ((last - prev) / prev).clamp(-TREND_LIMIT, TREND_LIMIT)
        } else {
            0.0
        }
    } else {
        0.0
    };

    let mut points = Vec::with_capacity(horizon);
    let mut lower = Vec::with_capacity(horizon);
    let mut upper = Vec::with_capacity(horizon);
    for i in 0..horizon {
        let value = (average * (1.0 + trend * (i + 1) as f64 * TREND_DAMPING)).max(0.0);
        points.push(value);
        lower.push((value - 2.0 * std_dev).max(0.0));
        upper.push(value + 2.0 * std_dev);
    }

    debug!(average, trend, "moving average fallback used");
    Some(FallbackForecast {
        points,
        lower,
        upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_short_series_fallback() {
        // Seasonality-too-short scenario: four points, bounded trend.
        let values = vec![10.0, 12.0, 11.0, 13.0];
        let forecast = moving_average_fallback(&values, 3).unwrap();

        // Trailing average 11.5, trend (13-11)/11 clamped to +10%.
        let trend: f64 = (2.0 / 11.0_f64).min(0.1);
        assert_relative_eq!(
            forecast.points[0],
            11.5 * (1.0 + trend * 0.5),
            epsilon = 1e-9
        );
        for (point, low) in forecast.points.iter().zip(&forecast.lower) {
            assert!(*point >= 0.0);
            assert!(*low >= 0.0);
        }
    }

    #[test]
    fn test_negative_trend_never_goes_negative() {
        let values = vec![100.0, 10.0, 5.0, 1.0];
        let forecast = moving_average_fallback(&values, 12).unwrap();
        for point in &forecast.points {
            assert!(*point >= 0.0);
        }
    }

    #[test]
    fn test_single_point() {
        let forecast = moving_average_fallback(&[20.0], 2).unwrap();
        assert_relative_eq!(forecast.points[0], 20.0, epsilon = 1e-9);
        // Std dev proxy is 10% of the average.
        assert_relative_eq!(forecast.lower[0], 16.0, epsilon = 1e-9);
        assert_relative_eq!(forecast.upper[0], 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_is_none() {
        assert!(moving_average_fallback(&[], 3).is_none());
    }
}
