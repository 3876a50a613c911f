//! Forecast result types and the fitted models
//!
//! A forecast is either fitted by a statistical model, produced by the
//! deterministic fallback, or absent because the series is too short. The
//! three cases are distinct variants so callers branch on structure, never
//! on a model-name string.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub mod decomposition;
pub mod fallback;
pub mod sarimax;

/// Seasonal cycle length: four weekly periods approximate a monthly cycle.
pub const SEASONAL_PERIOD: usize = 4;

/// Two-sided confidence level of every forecast interval.
pub const CONFIDENCE_LEVEL: f64 = 0.85;

/// Orders and fit metadata for one produced forecast.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelInfo {
    /// Non-seasonal (p, d, q) order, when a statistical model fit.
    pub order: Option<(usize, usize, usize)>,
    /// Seasonal (P, D, Q, s) order, when the seasonal term was active.
    pub seasonal_order: Option<(usize, usize, usize, usize)>,
    /// AIC-style fit-quality score, lower is better.
    pub aic: Option<f64>,
    /// Exogenous columns actually used by the fit.
    pub exog_used: Option<Vec<String>>,
    /// Method tag for non-statistical forecasts ("simple_moving_average",
    /// "derived").
    pub method: Option<String>,
    /// Averaging window of the fallback forecast.
    pub window: Option<usize>,
    /// Trend changepoints used by the decomposition model.
    pub changepoints: Option<usize>,
    /// Composition formula for derived forecasts.
    pub formula: Option<String>,
    /// Model labels of the driver forecasts a derived forecast multiplies.
    pub source_models: Option<BTreeMap<String, String>>,
}

/// Cap application record; present on a forecast iff a cap rule ran and
/// clamped at least one week.
#[derive(Debug, Clone, Serialize)]
pub struct CapInfo {
    /// Which rule applied: "transit_conversion", "transits" or "upo".
    pub rule: String,
    /// The ceiling the forecast was clamped to.
    pub cap_value: f64,
    /// Number of point estimates that exceeded the ceiling.
    pub capped_weeks: usize,
}

/// One future week's promo score, as used by the exogenous regressor.
#[derive(Debug, Clone, Serialize)]
pub struct FutureScore {
    pub week: String,
    pub score: f64,
}

/// Promo regressor usage record; present iff the fit consumed promo scores.
#[derive(Debug, Clone, Serialize)]
pub struct PromoInfo {
    /// Historical weeks that carried an authored score.
    pub historical_weeks_with_scores: usize,
    /// Historical weeks the fit covered.
    pub total_historical_weeks: usize,
    /// Scores applied to each forecast week.
    pub future_scores: Vec<FutureScore>,
    /// Weeks where the promo floor replaced a lower promo-adjusted value.
    pub floor_applied_weeks: usize,
    /// Weeks forced to the baseline because no promotion was scheduled.
    pub baseline_used_weeks: usize,
}

/// One produced forecast series with its 85% interval.
///
/// `promo_info` and `cap_info` are always present in the payload and null
/// until the corresponding rule runs; the shape never varies.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
    /// Display label, e.g. "SARIMAX", "SARIMAX (Capped) +Promo".
    pub model: String,
    pub model_info: ModelInfo,
    pub promo_info: Option<PromoInfo>,
    pub cap_info: Option<CapInfo>,
}

impl ForecastResult {
    /// Number of forecast periods.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the forecast carries no periods.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of a fit request.
#[derive(Debug, Clone)]
pub enum Forecast {
    /// A statistical model fit the series.
    Fitted(ForecastResult),
    /// The model failed numerically and the deterministic fallback ran.
    Fallback(ForecastResult),
    /// Too little data to produce anything; distinct from a fit failure.
    Insufficient,
}

impl Forecast {
    /// The produced series, if any.
    pub fn result(&self) -> Option<&ForecastResult> {
        match self {
            Forecast::Fitted(r) | Forecast::Fallback(r) => Some(r),
            Forecast::Insufficient => None,
        }
    }

    /// Consume into the produced series, if any.
    pub fn into_result(self) -> Option<ForecastResult> {
        match self {
            Forecast::Fitted(r) | Forecast::Fallback(r) => Some(r),
            Forecast::Insufficient => None,
        }
    }

    /// True when no forecast could be produced.
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Forecast::Insufficient)
    }
}
