//! Forecast accuracy scoring
//!
//! Compares the manually authored forecast against actuals over the weeks
//! both cover. Scores exist per timeframe: the whole overlap, the trailing
//! four joined weeks, or the single most recent joined week.

use chrono::NaiveDate;
use haul_data::keys::{Marketplace, Metric};
use haul_data::store::Dataset;
use serde::Serialize;
use std::collections::BTreeMap;

/// Scoring window over the joined rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Timeframe {
    /// Every overlapping week.
    All,
    /// The trailing four joined weeks.
    Trailing4,
    /// The single most recent joined week.
    CurrentWeek,
}

impl Timeframe {
    /// Short API tag for the timeframe.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::All => "total",
            Timeframe::Trailing4 => "t4w",
            Timeframe::CurrentWeek => "cw",
        }
    }

    /// Parse an API tag, defaulting to the full overlap.
    pub fn from_str_or_default(tag: &str) -> Timeframe {
        match tag {
            "t4w" => Timeframe::Trailing4,
            "cw" => Timeframe::CurrentWeek,
            _ => Timeframe::All,
        }
    }
}

/// Accuracy scores for one metric × marketplace × timeframe.
#[derive(Debug, Clone, Serialize)]
pub struct AccuracyRecord {
    /// Mean absolute percentage error, unweighted.
    pub mape: f64,
    /// Weighted MAPE: total absolute error over total actuals.
    pub wmape: f64,
    /// Signed bias: total (forecast − actual) over total actuals.
    pub bias: f64,
    /// max(0, 100 − WMAPE).
    pub accuracy: f64,
    /// Joined weeks the score covers, after the zero-actual guard.
    pub overlap_count: usize,
}

/// One row of the per-week deviation view.
#[derive(Debug, Clone, Serialize)]
pub struct DeviationRow {
    pub week: String,
    pub date: NaiveDate,
    pub actual: f64,
    pub manual_forecast: Option<f64>,
    pub manual_dev: Option<f64>,
    pub manual_dev_pct: Option<f64>,
}

/// Per-week deviations plus summary averages.
#[derive(Debug, Clone, Serialize)]
pub struct DeviationTable {
    pub rows: Vec<DeviationRow>,
    pub total_weeks: usize,
    pub manual_forecast_weeks: usize,
    pub manual_avg_dev_pct: Option<f64>,
    pub manual_avg_abs_dev_pct: Option<f64>,
}

/// Score the manual forecast against actuals.
///
/// `None` when no manual forecast is loaded, either series is empty, or no
/// joined week survives the zero-actual guard.
pub fn score(
    dataset: &Dataset,
    metric: Metric,
    marketplace: Marketplace,
    timeframe: Timeframe,
) -> Option<AccuracyRecord> {
    let manual = dataset.manual_forecast()?;
    let actuals = dataset.actuals().clean_table(metric, marketplace);
    let forecast = manual.clean_table(metric, marketplace);
    if actuals.is_empty() || forecast.is_empty() {
        return None;
    }

    // Inner join by date, sorted.
    let forecast_by_date: BTreeMap<NaiveDate, f64> =
        forecast.iter().map(|p| (p.date, p.value)).collect();
    let mut joined: Vec<(NaiveDate, f64, f64)> = actuals
        .iter()
        .filter_map(|p| forecast_by_date.get(&p.date).map(|f| (p.date, p.value, *f)))
        .collect();
    joined.sort_by_key(|(date, _, _)| *date);

    // Slice the timeframe, then guard against division by zero actuals.
    let window = match timeframe {
        Timeframe::All => joined.len(),
        Timeframe::Trailing4 => 4,
        Timeframe::CurrentWeek => 1,
    };
    let sliced = &joined[joined.len().saturating_sub(window)..];
    let rows: Vec<&(NaiveDate, f64, f64)> =
        sliced.iter().filter(|(_, actual, _)| *actual != 0.0).collect();
    if rows.is_empty() {
        return None;
    }

    let n = rows.len() as f64;
    let mape = rows
        .iter()
        .map(|(_, actual, forecast)| ((forecast - actual) / actual).abs())
        .sum::<f64>()
        / n
        * 100.0;
    let abs_error: f64 = rows
        .iter()
        .map(|(_, actual, forecast)| (forecast - actual).abs())
        .sum();
    let signed_error: f64 = rows
        .iter()
        .map(|(_, actual, forecast)| forecast - actual)
        .sum();
    let total_actual: f64 = rows.iter().map(|(_, actual, _)| actual).sum();
    let wmape = abs_error / total_actual * 100.0;
    let bias = signed_error / total_actual * 100.0;
    let accuracy = (100.0 - wmape).max(0.0);

    Some(AccuracyRecord {
        mape,
        wmape,
        bias,
        accuracy,
        overlap_count: rows.len(),
    })
}

/// Score every populated metric × marketplace pair for one timeframe,
/// keyed by canonical labels.
pub fn score_all(
    dataset: &Dataset,
    timeframe: Timeframe,
) -> BTreeMap<String, BTreeMap<String, AccuracyRecord>> {
    let mut out = BTreeMap::new();
    for metric in Metric::ALL {
        let mut per_mp = BTreeMap::new();
        for marketplace in Marketplace::ALL {
            if let Some(record) = score(dataset, metric, marketplace, timeframe) {
                per_mp.insert(marketplace.code().to_string(), record);
            }
        }
        if !per_mp.is_empty() {
            out.insert(metric.label().to_string(), per_mp);
        }
    }
    out
}

/// Per-week actual vs. manual-forecast deviations for one series.
pub fn deviation_table(
    dataset: &Dataset,
    metric: Metric,
    marketplace: Marketplace,
) -> Option<DeviationTable> {
    let actuals = dataset.actuals().clean_table(metric, marketplace);
    if actuals.is_empty() {
        return None;
    }
    let forecast_by_date: BTreeMap<NaiveDate, f64> = dataset
        .manual_forecast()
        .map(|store| {
            store
                .clean_table(metric, marketplace)
                .into_iter()
                .map(|p| (p.date, p.value))
                .collect()
        })
        .unwrap_or_default();

    let rows: Vec<DeviationRow> = actuals
        .into_iter()
        .map(|point| {
            let manual = forecast_by_date.get(&point.date).copied();
            let (dev, dev_pct) = match manual {
                Some(m) if m != 0.0 => {
                    let dev = point.value - m;
                    (Some(dev), Some(dev / m * 100.0))
                }
                _ => (None, None),
            };
            DeviationRow {
                week: point.label,
                date: point.date,
                actual: point.value,
                manual_forecast: manual,
                manual_dev: dev,
                manual_dev_pct: dev_pct,
            }
        })
        .collect();

    let devs: Vec<f64> = rows.iter().filter_map(|r| r.manual_dev_pct).collect();
    let total_weeks = rows.len();
    let manual_forecast_weeks = devs.len();
    let (avg_dev, avg_abs_dev) = if devs.is_empty() {
        (None, None)
    } else {
        let n = devs.len() as f64;
        (
            Some(devs.iter().sum::<f64>() / n),
            Some(devs.iter().map(|d| d.abs()).sum::<f64>() / n),
        )
    };

    Some(DeviationTable {
        rows,
        total_weeks,
        manual_forecast_weeks,
        manual_avg_dev_pct: avg_dev,
        manual_avg_abs_dev_pct: avg_abs_dev,
    })
}
