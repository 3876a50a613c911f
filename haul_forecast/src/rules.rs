//! Business-rule post-processor
//!
//! Deterministic rules applied to already-produced forecasts: metric caps
//! against runaway extrapolation, promo-floor blending against a
//! promo-blind baseline, and the multiplicative composition of Net Ordered
//! Units from its three capped drivers. Nothing here ever re-fits a model;
//! caps always run before composition.

use crate::models::{CapInfo, ForecastResult, ModelInfo, PromoInfo};
use haul_data::keys::{Marketplace, Metric};
use haul_data::store::MetricStore;
use std::collections::BTreeMap;

/// Maximum Transit Conversion rate.
pub const MAX_TRANSIT_CONVERSION: f64 = 0.10;
/// UPO cap: marketplace historical max × 2.
pub const UPO_CAP_MULTIPLIER: f64 = 2.0;
/// Transits cap: marketplace historical max × 3 (also bounded by EU5 max).
pub const TRANSITS_CAP_MULTIPLIER: f64 = 3.0;

/// Label suffix recorded when any cap clamps.
const CAPPED_SUFFIX: &str = " (Capped)";
/// Label suffix recorded when promo-floor blending changed a week.
const PROMO_SUFFIX: &str = " +Promo";

/// Cap Transit Conversion forecasts at 10%.
pub fn cap_transit_conversion(forecast: &mut ForecastResult) {
    clamp_to(forecast, MAX_TRANSIT_CONVERSION, "transit_conversion");
}

/// Cap UPO forecasts at twice the marketplace's own historical maximum.
pub fn cap_upo(forecast: &mut ForecastResult, mp_historical_max: Option<f64>) {
    let Some(max) = mp_historical_max else {
        // Nothing to cap against.
        return;
    };
    clamp_to(forecast, max * UPO_CAP_MULTIPLIER, "upo");
}

/// Cap Transits forecasts: no marketplace may forecast more transits than
/// EU5 ever had, nor more than three times its own historical maximum.
pub fn cap_transits(
    forecast: &mut ForecastResult,
    mp_historical_max: Option<f64>,
    eu5_historical_max: Option<f64>,
) {
    let candidates = [
        eu5_historical_max,
        mp_historical_max.map(|m| m * TRANSITS_CAP_MULTIPLIER),
    ];
    let Some(cap) = candidates
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.min(c))))
    else {
        return;
    };
    clamp_to(forecast, cap, "transits");
}

/// Dispatch the cap rule for a driver metric, reading historical maxima
/// from the actuals store.
pub fn apply_cap(
    forecast: &mut ForecastResult,
    metric: Metric,
    marketplace: Marketplace,
    actuals: &MetricStore,
) {
    match metric {
        Metric::TransitConversion => cap_transit_conversion(forecast),
        Metric::Transits => cap_transits(
            forecast,
            actuals.historical_max(Metric::Transits, marketplace),
            actuals.historical_max(Metric::Transits, Marketplace::Eu5),
        ),
        Metric::Upo => cap_upo(forecast, actuals.historical_max(Metric::Upo, marketplace)),
        Metric::NetOrderedUnits => {}
    }
}

/// Clamp points and both bounds to `cap`; record the rule when any point
/// exceeded it.
fn clamp_to(forecast: &mut ForecastResult, cap: f64, rule: &str) {
    let mut capped_weeks = 0usize;
    for value in &mut forecast.values {
        if *value > cap {
            *value = cap;
            capped_weeks += 1;
        }
    }
    for bound in forecast
        .lower_bound
        .iter_mut()
        .chain(forecast.upper_bound.iter_mut())
    {
        if *bound > cap {
            *bound = cap;
        }
    }

    if capped_weeks > 0 {
        forecast.cap_info = Some(CapInfo {
            rule: rule.to_string(),
            cap_value: cap,
            capped_weeks,
        });
        if !forecast.model.contains("(Capped)") {
            forecast.model.push_str(CAPPED_SUFFIX);
        }
    }
}

/// Blend a promo-adjusted forecast against its promo-blind baseline.
///
/// Per week: intensity > 1 means a promotion can only raise the forecast,
/// so point and both bounds take the pointwise maximum; intensity == 1
/// forces the baseline outright; intensity < 1 leaves the promo-adjusted
/// value untouched.
pub fn apply_promo_floor(
    forecast: &mut ForecastResult,
    baseline: &ForecastResult,
    future_scores: &[f64],
) {
    let mut floor_applied_weeks = 0usize;
    let mut baseline_used_weeks = 0usize;
    let len = forecast.len().min(baseline.len());

    for i in 0..len {
        let score = future_scores.get(i).copied().unwrap_or(1.0);
        if score > 1.0 {
            if forecast.values[i] < baseline.values[i] {
                forecast.values[i] = baseline.values[i];
                floor_applied_weeks += 1;
            }
            forecast.lower_bound[i] = forecast.lower_bound[i].max(baseline.lower_bound[i]);
            forecast.upper_bound[i] = forecast.upper_bound[i].max(baseline.upper_bound[i]);
        } else if score == 1.0 {
            forecast.values[i] = baseline.values[i];
            forecast.lower_bound[i] = baseline.lower_bound[i];
            forecast.upper_bound[i] = baseline.upper_bound[i];
            baseline_used_weeks += 1;
        }
        // score < 1: a weak-promo week may legitimately come in lower.
    }

    let promo_info = forecast.promo_info.get_or_insert_with(|| PromoInfo {
        historical_weeks_with_scores: 0,
        total_historical_weeks: 0,
        future_scores: Vec::new(),
        floor_applied_weeks: 0,
        baseline_used_weeks: 0,
    });
    promo_info.floor_applied_weeks = floor_applied_weeks;
    promo_info.baseline_used_weeks = baseline_used_weeks;

    if (floor_applied_weeks > 0 || baseline_used_weeks > 0)
        && !forecast.model.contains("+Promo")
    {
        forecast.model.push_str(PROMO_SUFFIX);
    }
}

/// Compose the Net Ordered Units forecast as the product of its three
/// capped drivers for the same marketplace and horizon.
///
/// Bounds multiply lower-with-lower and upper-with-upper: a deliberately
/// conservative approximation of the combined interval, kept as-is.
pub fn compose_net_ordered_units(
    transits: &ForecastResult,
    conversion: &ForecastResult,
    upo: &ForecastResult,
) -> ForecastResult {
    let len = transits
        .len()
        .min(conversion.len())
        .min(upo.len());

    let mut values = Vec::with_capacity(len);
    let mut lower_bound = Vec::with_capacity(len);
    let mut upper_bound = Vec::with_capacity(len);
    for i in 0..len {
        values.push((transits.values[i] * conversion.values[i] * upo.values[i]).max(0.0));
        lower_bound.push(
            (transits.lower_bound[i] * conversion.lower_bound[i] * upo.lower_bound[i]).max(0.0),
        );
        upper_bound.push(
            (transits.upper_bound[i] * conversion.upper_bound[i] * upo.upper_bound[i]).max(0.0),
        );
    }

    let source_models = BTreeMap::from([
        (Metric::Transits.label().to_string(), transits.model.clone()),
        (
            Metric::TransitConversion.label().to_string(),
            conversion.model.clone(),
        ),
        (Metric::Upo.label().to_string(), upo.model.clone()),
    ]);

    ForecastResult {
        dates: transits.dates[..len].to_vec(),
        values,
        lower_bound,
        upper_bound,
        model: "Calculated (T×C×U)".to_string(),
        model_info: ModelInfo {
            method: Some("derived".to_string()),
            formula: Some("Transits × Transit Conversion × UPO".to_string()),
            source_models: Some(source_models),
            ..ModelInfo::default()
        },
        promo_info: None,
        cap_info: None,
    }
}
