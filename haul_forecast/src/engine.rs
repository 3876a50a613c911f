//! Forecasting engine
//!
//! Turns a clean observation table into a weekly-gridded series, dispatches
//! the requested model, and degrades deterministically: numerical fit
//! failure runs the moving-average fallback, too little data yields the
//! explicit `Insufficient` outcome.

use crate::error::Result;
use crate::models::decomposition::fit_decomposition;
use crate::models::fallback::{moving_average_fallback, FALLBACK_WINDOW};
use crate::models::sarimax::fit_sarimax;
use crate::models::{Forecast, ForecastResult, FutureScore, ModelInfo, PromoInfo};
use chrono::{Datelike, Duration, NaiveDate};
use haul_data::store::ObservedPoint;
use haul_data::week::format_week_label;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Default number of future weekly periods.
pub const FORECAST_HORIZON: usize = 12;
/// Minimum clean observations before any model is attempted.
const MIN_POINTS: usize = 4;
/// Minimum resampled observations before the seasonal term activates.
const MIN_SEASONAL_POINTS: usize = 8;
/// Name of the promotional exogenous column.
const PROMO_COLUMN: &str = "promo_score";

/// Which statistical model to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    /// Seasonal ARIMA with optional exogenous regressor.
    #[default]
    Sarimax,
    /// Trend/seasonality decomposition with changepoints.
    Decomposition,
}

/// Fit configuration.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub use_seasonality: bool,
    pub model: ModelKind,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            use_seasonality: true,
            model: ModelKind::Sarimax,
        }
    }
}

/// The forecaster: horizon fixed at construction, as the request fixes it.
#[derive(Debug, Clone)]
pub struct Forecaster {
    horizon: usize,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(FORECAST_HORIZON)
    }
}

impl Forecaster {
    /// Create a forecaster for a fixed horizon.
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    /// The configured horizon.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Fit a series and forecast.
    ///
    /// `exogenous` maps canonical week labels to promo intensity scores;
    /// when present it is aligned to the resampled weekly grid, gaps
    /// imputed with the regressor's own mean. If no week aligns at all the
    /// regressor is silently dropped and the fit proceeds without it.
    pub fn fit(
        &self,
        series: &[ObservedPoint],
        options: &FitOptions,
        exogenous: Option<&BTreeMap<String, f64>>,
    ) -> Forecast {
        if series.len() < MIN_POINTS {
            return Forecast::Insufficient;
        }

        let mut sorted: Vec<(NaiveDate, f64)> =
            series.iter().map(|p| (p.date, p.value)).collect();
        sorted.sort_by_key(|(date, _)| *date);

        let Some(weekly) = resample_weekly(&sorted) else {
            return Forecast::Insufficient;
        };
        if weekly.values.len() < MIN_POINTS {
            return Forecast::Insufficient;
        }

        let exog = exogenous.and_then(|scores| align_exogenous(&weekly, scores, self.horizon));
        let seasonal = options.use_seasonality && weekly.values.len() >= MIN_SEASONAL_POINTS;

        let fitted = self.fit_model(&weekly, options, seasonal, exog.as_ref());
        match fitted {
            Ok(result) => Forecast::Fitted(result),
            Err(e) => {
                warn!(error = %e, "model fit failed, using fallback");
                match self.fallback(&sorted) {
                    Some(result) => Forecast::Fallback(result),
                    None => Forecast::Insufficient,
                }
            }
        }
    }

    fn fit_model(
        &self,
        weekly: &WeeklySeries,
        options: &FitOptions,
        seasonal: bool,
        exog: Option<&AlignedExogenous>,
    ) -> Result<ForecastResult> {
        let dates = future_dates(weekly.last_date(), self.horizon);

        match options.model {
            ModelKind::Sarimax => {
                let fit = fit_sarimax(
                    &weekly.values,
                    exog.map(|e| (e.historical.as_slice(), e.future.as_slice())),
                    seasonal,
                    self.horizon,
                )?;
                let model = if options.use_seasonality {
                    "SARIMAX"
                } else {
                    "ARIMAX"
                };
                Ok(ForecastResult {
                    dates,
                    values: clamp_non_negative(fit.points),
                    lower_bound: clamp_non_negative(fit.lower),
                    upper_bound: clamp_non_negative(fit.upper),
                    model: model.to_string(),
                    model_info: ModelInfo {
                        order: Some(fit.order),
                        seasonal_order: fit.seasonal_order,
                        aic: Some(fit.aic),
                        exog_used: exog.map(|_| vec![PROMO_COLUMN.to_string()]),
                        ..ModelInfo::default()
                    },
                    promo_info: exog.map(|e| e.promo_info(self.horizon, weekly)),
                    cap_info: None,
                })
            }
            ModelKind::Decomposition => {
                let fit = fit_decomposition(&weekly.values, options.use_seasonality, self.horizon)?;
                Ok(ForecastResult {
                    dates,
                    values: clamp_non_negative(fit.points),
                    lower_bound: clamp_non_negative(fit.lower),
                    upper_bound: clamp_non_negative(fit.upper),
                    model: "Decomposition".to_string(),
                    model_info: ModelInfo {
                        aic: Some(fit.aic),
                        changepoints: Some(fit.changepoints),
                        ..ModelInfo::default()
                    },
                    promo_info: None,
                    cap_info: None,
                })
            }
        }
    }

    /// Deterministic fallback on the original clean observations.
    fn fallback(&self, sorted: &[(NaiveDate, f64)]) -> Option<ForecastResult> {
        let values: Vec<f64> = sorted.iter().map(|(_, v)| *v).collect();
        let fallback = moving_average_fallback(&values, self.horizon)?;
        let last_date = sorted.last().map(|(d, _)| *d)?;
        Some(ForecastResult {
            dates: future_dates(last_date, self.horizon),
            values: fallback.points,
            lower_bound: fallback.lower,
            upper_bound: fallback.upper,
            model: "Moving Average (Fallback)".to_string(),
            model_info: ModelInfo {
                method: Some("simple_moving_average".to_string()),
                window: Some(FALLBACK_WINDOW),
                ..ModelInfo::default()
            },
            promo_info: None,
            cap_info: None,
        })
    }
}

/// A strict weekly grid of values, Monday-anchored, gap-free.
#[derive(Debug, Clone)]
struct WeeklySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl WeeklySeries {
    fn last_date(&self) -> NaiveDate {
        // Non-empty by construction.
        self.dates[self.dates.len() - 1]
    }
}

/// Exogenous column aligned to the weekly grid.
#[derive(Debug, Clone)]
struct AlignedExogenous {
    historical: Vec<f64>,
    future: Vec<f64>,
    authored_weeks: usize,
}

impl AlignedExogenous {
    fn promo_info(&self, horizon: usize, weekly: &WeeklySeries) -> PromoInfo {
        let future_scores = future_dates(weekly.last_date(), horizon)
            .into_iter()
            .zip(&self.future)
            .map(|(date, &score)| FutureScore {
                week: format_week_label(date),
                score,
            })
            .collect();
        PromoInfo {
            historical_weeks_with_scores: self.authored_weeks,
            total_historical_weeks: self.historical.len(),
            future_scores,
            floor_applied_weeks: 0,
            baseline_used_weeks: 0,
        }
    }
}

/// Snap observations onto a Monday-anchored weekly grid: duplicates within
/// a week collapse to their mean, gaps forward-fill.
fn resample_weekly(sorted: &[(NaiveDate, f64)]) -> Option<WeeklySeries> {
    let mut buckets: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    for (date, value) in sorted {
        let monday = *date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let bucket = buckets.entry(monday).or_insert((0.0, 0));
        bucket.0 += value;
        bucket.1 += 1;
    }

    let first = *buckets.keys().next()?;
    let last = *buckets.keys().next_back()?;

    let mut dates = Vec::new();
    let mut values = Vec::new();
    let mut cursor = first;
    let mut previous = None;
    while cursor <= last {
        let value = match buckets.get(&cursor) {
            Some((sum, count)) => sum / f64::from(*count),
            None => previous?,
        };
        dates.push(cursor);
        values.push(value);
        previous = Some(value);
        cursor = cursor + Duration::weeks(1);
    }

    Some(WeeklySeries { dates, values })
}

/// Align promo scores to the weekly grid. Authored weeks keep their score;
/// gaps take the regressor's own mean; a fully unmatched column disables
/// exogenous fitting by returning `None`.
fn align_exogenous(
    weekly: &WeeklySeries,
    scores: &BTreeMap<String, f64>,
    horizon: usize,
) -> Option<AlignedExogenous> {
    let looked_up: Vec<Option<f64>> = weekly
        .dates
        .iter()
        .map(|date| scores.get(&format_week_label(*date)).copied())
        .collect();

    let authored_weeks = looked_up.iter().flatten().count();
    if authored_weeks == 0 {
        debug!("no promo scores align with the series; exogenous fit disabled");
        return None;
    }
    let mean = looked_up.iter().flatten().sum::<f64>() / authored_weeks as f64;

    let historical: Vec<f64> = looked_up.into_iter().map(|s| s.unwrap_or(mean)).collect();
    let future: Vec<f64> = future_dates(weekly.last_date(), horizon)
        .into_iter()
        .map(|date| {
            scores
                .get(&format_week_label(date))
                .copied()
                .unwrap_or(mean)
        })
        .collect();

    Some(AlignedExogenous {
        historical,
        future,
        authored_weeks,
    })
}

/// The `horizon` weekly dates following `last`.
fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|i| last + Duration::weeks(i))
        .collect()
}

/// Clamp every value to ≥ 0, as count metrics require.
fn clamp_non_negative(values: Vec<f64>) -> Vec<f64> {
    values.into_iter().map(|v| v.max(0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[f64]) -> Vec<ObservedPoint> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let date = start + Duration::weeks(i as i64);
                ObservedPoint {
                    date,
                    value,
                    label: format_week_label(date),
                }
            })
            .collect()
    }

    #[test]
    fn test_insufficient_below_four_points() {
        let forecaster = Forecaster::new(4);
        let outcome = forecaster.fit(&points(&[1.0, 2.0, 3.0]), &FitOptions::default(), None);
        assert!(outcome.is_insufficient());
    }

    #[test]
    fn test_fitted_outcome_has_full_horizon() {
        let forecaster = Forecaster::default();
        let series = points(&[100.0, 110.0, 105.0, 115.0, 108.0, 120.0, 112.0, 125.0]);
        let outcome = forecaster.fit(&series, &FitOptions::default(), None);
        let result = outcome.result().expect("fit should produce a forecast");
        assert_eq!(result.len(), FORECAST_HORIZON);
        assert_eq!(result.dates.len(), FORECAST_HORIZON);
        // Weekly cadence.
        assert_eq!(result.dates[1] - result.dates[0], Duration::weeks(1));
        // Bounds bracket the point forecast.
        for i in 0..result.len() {
            assert!(result.lower_bound[i] <= result.values[i]);
            assert!(result.values[i] <= result.upper_bound[i]);
        }
    }

    #[test]
    fn test_four_points_fall_back() {
        // Seasonality requested but the series is far too short: the model
        // cannot identify its parameters and the fallback runs instead.
        let forecaster = Forecaster::new(3);
        let series = points(&[10.0, 12.0, 11.0, 13.0]);
        let outcome = forecaster.fit(&series, &FitOptions::default(), None);
        let result = match outcome {
            Forecast::Fallback(result) => result,
            other => panic!("expected fallback, got {other:?}"),
        };
        assert_eq!(result.model, "Moving Average (Fallback)");
        // Trailing average 11.5 with a bounded upward trend, never negative.
        for value in &result.values {
            assert!(*value >= 11.5 && *value < 14.0);
        }
    }

    #[test]
    fn test_resample_collapses_duplicates_and_fills_gaps() {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let sorted = vec![
            (monday, 10.0),
            // Same business week, different day: averaged.
            (monday + Duration::days(2), 20.0),
            // One-week gap before this point: forward-filled.
            (monday + Duration::weeks(2), 30.0),
        ];
        let weekly = resample_weekly(&sorted).unwrap();
        assert_eq!(weekly.values, vec![15.0, 15.0, 30.0]);
        assert_eq!(weekly.dates[1], monday + Duration::weeks(1));
    }

    #[test]
    fn test_unmatched_exogenous_disables_silently() {
        let forecaster = Forecaster::new(2);
        let series = points(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0]);
        let scores = BTreeMap::from([("Wk01 1999".to_string(), 2.0)]);
        let outcome = forecaster.fit(&series, &FitOptions::default(), Some(&scores));
        let result = outcome.result().unwrap();
        assert!(result.model_info.exog_used.is_none());
        assert!(result.promo_info.is_none());
    }

    #[test]
    fn test_matched_exogenous_is_recorded() {
        let forecaster = Forecaster::new(2);
        let series = points(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0]);
        let label = format_week_label(series[3].date);
        let scores = BTreeMap::from([(label, 2.0)]);
        let outcome = forecaster.fit(&series, &FitOptions::default(), Some(&scores));
        let result = outcome.result().unwrap();
        assert_eq!(
            result.model_info.exog_used.as_deref(),
            Some(&["promo_score".to_string()][..])
        );
        let promo = result.promo_info.as_ref().unwrap();
        assert_eq!(promo.historical_weeks_with_scores, 1);
        assert_eq!(promo.total_historical_weeks, 8);
        assert_eq!(promo.future_scores.len(), 2);
    }
}
