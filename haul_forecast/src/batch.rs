//! Batch forecasting across every driver metric and marketplace
//!
//! Fits are independent per (metric, marketplace) pair and run in parallel;
//! the derived Net Ordered Units composition waits for all three of its
//! drivers. Caps run per driver before composition, and promo-floor
//! blending runs between the promo-adjusted and baseline fits. A pair that
//! cannot be forecast is simply absent from the result set.

use crate::engine::{FitOptions, Forecaster, ModelKind, FORECAST_HORIZON};
use crate::models::{Forecast, ForecastResult};
use crate::rules::{apply_cap, apply_promo_floor, compose_net_ordered_units};
use haul_data::keys::{Marketplace, Metric};
use haul_data::store::Dataset;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Batch configuration.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub model: ModelKind,
    pub use_seasonality: bool,
    /// Fit each driver twice (promo-adjusted and baseline) and blend with
    /// the promo floor. Requires loaded promo scores to have any effect.
    pub include_promo: bool,
    pub horizon: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            model: ModelKind::Sarimax,
            use_seasonality: true,
            include_promo: false,
            horizon: FORECAST_HORIZON,
        }
    }
}

/// Forecasts for every pair that produced one, keyed by metric then
/// marketplace.
#[derive(Debug, Clone, Default)]
pub struct BatchForecasts {
    forecasts: BTreeMap<Metric, BTreeMap<Marketplace, ForecastResult>>,
}

impl BatchForecasts {
    /// Forecast for one pair, if produced.
    pub fn get(&self, metric: Metric, marketplace: Marketplace) -> Option<&ForecastResult> {
        self.forecasts.get(&metric)?.get(&marketplace)
    }

    /// All forecasts keyed by canonical labels, for the presentation
    /// boundary.
    pub fn payloads(&self) -> BTreeMap<String, BTreeMap<String, &ForecastResult>> {
        let mut out = BTreeMap::new();
        for (metric, per_mp) in &self.forecasts {
            let entry: &mut BTreeMap<String, &ForecastResult> =
                out.entry(metric.label().to_string()).or_default();
            for (marketplace, forecast) in per_mp {
                entry.insert(marketplace.code().to_string(), forecast);
            }
        }
        out
    }

    /// Number of produced forecasts.
    pub fn len(&self) -> usize {
        self.forecasts.values().map(BTreeMap::len).sum()
    }

    /// True when nothing could be forecast.
    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }
}

/// Fit every driver metric for every marketplace, apply the business rules,
/// and compose Net Ordered Units from the capped drivers.
pub fn forecast_all(dataset: &Dataset, options: &BatchOptions) -> BatchForecasts {
    let forecaster = Forecaster::new(options.horizon);
    let fit_options = FitOptions {
        use_seasonality: options.use_seasonality,
        model: options.model,
    };

    let pairs: Vec<(Metric, Marketplace)> = Metric::DRIVERS
        .iter()
        .flat_map(|metric| Marketplace::ALL.iter().map(|mp| (*metric, *mp)))
        .collect();

    // Driver fits are embarrassingly parallel across pairs.
    let driver_results: Vec<((Metric, Marketplace), ForecastResult)> = pairs
        .par_iter()
        .filter_map(|&(metric, marketplace)| {
            fit_pair(dataset, &forecaster, &fit_options, options, metric, marketplace)
                .map(|forecast| ((metric, marketplace), forecast))
        })
        .collect();

    let mut batch = BatchForecasts::default();
    for ((metric, marketplace), forecast) in driver_results {
        batch
            .forecasts
            .entry(metric)
            .or_default()
            .insert(marketplace, forecast);
    }

    // Derived composition waits for all three drivers of a marketplace.
    let mut derived = BTreeMap::new();
    for marketplace in Marketplace::ALL {
        let transits = batch.get(Metric::Transits, marketplace);
        let conversion = batch.get(Metric::TransitConversion, marketplace);
        let upo = batch.get(Metric::Upo, marketplace);
        if let (Some(t), Some(c), Some(u)) = (transits, conversion, upo) {
            derived.insert(marketplace, compose_net_ordered_units(t, c, u));
        }
    }
    if !derived.is_empty() {
        batch.forecasts.insert(Metric::NetOrderedUnits, derived);
    }

    debug!(forecasts = batch.len(), "batch forecast complete");
    batch
}

/// Fit one driver pair: promo-adjusted plus baseline when requested, promo
/// floor blended, cap applied. `None` when the pair cannot be forecast.
fn fit_pair(
    dataset: &Dataset,
    forecaster: &Forecaster,
    fit_options: &FitOptions,
    options: &BatchOptions,
    metric: Metric,
    marketplace: Marketplace,
) -> Option<ForecastResult> {
    let series = dataset.actuals().clean_table(metric, marketplace);
    if series.len() < 4 {
        return None;
    }

    // Promo scores only enter the seasonal-ARIMA model as a regressor.
    let exog = (options.include_promo && options.model == ModelKind::Sarimax)
        .then(|| dataset.promo_scores())
        .flatten()
        .and_then(|promo| promo.scores_for(marketplace));

    let mut forecast = match exog {
        Some(scores) => {
            let baseline = forecaster
                .fit(&series, fit_options, None)
                .into_result();
            let promo_outcome = forecaster.fit(&series, fit_options, Some(scores));
            match (promo_outcome.into_result(), baseline) {
                (Some(mut promo_forecast), Some(baseline_forecast)) => {
                    let future_scores: Vec<f64> = promo_forecast
                        .promo_info
                        .as_ref()
                        .map(|info| info.future_scores.iter().map(|fs| fs.score).collect())
                        .unwrap_or_default();
                    if !future_scores.is_empty() {
                        apply_promo_floor(&mut promo_forecast, &baseline_forecast, &future_scores);
                    }
                    Some(promo_forecast)
                }
                (forecast, _) => forecast,
            }
        }
        None => forecaster.fit(&series, fit_options, None).into_result(),
    }?;

    apply_cap(&mut forecast, metric, marketplace, dataset.actuals());
    Some(forecast)
}

/// Fit a single metric × marketplace pair without the batch machinery,
/// honouring the promo regressor when requested.
pub fn forecast_single(
    dataset: &Dataset,
    metric: Metric,
    marketplace: Marketplace,
    options: &BatchOptions,
) -> Forecast {
    let forecaster = Forecaster::new(options.horizon);
    let fit_options = FitOptions {
        use_seasonality: options.use_seasonality,
        model: options.model,
    };
    let series = dataset.actuals().clean_table(metric, marketplace);

    let exog = (options.include_promo && options.model == ModelKind::Sarimax)
        .then(|| dataset.promo_scores())
        .flatten()
        .and_then(|promo| promo.scores_for(marketplace));

    forecaster.fit(&series, &fit_options, exog)
}
