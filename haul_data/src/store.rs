//! Time series stores for actuals and manual forecasts
//!
//! A store holds one ingested sheet: per metric × marketplace value rows on
//! a shared week axis. The EU5 row is always recomputed from the five
//! national marketplaces; it is never trusted from the sheet. A `Dataset`
//! bundles the actuals store with the optional manual-forecast store and
//! promo scores, replacing any notion of a process-global current dataset.

use crate::error::{DataError, Result};
use crate::grid::{Grid, Workbook};
use crate::keys::{Marketplace, Metric};
use crate::locator::locate_metric_section;
use crate::promo::{parse_promo_grid, PromoScores};
use crate::week::{format_week_label, parse_week_label};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One clean observation: the canonical input row for forecasting and
/// statistics. Rows with missing values or unparseable dates never make it
/// into one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub label: String,
}

/// What ingestion managed to parse, for surfacing alongside the store.
#[derive(Debug, Clone, Default)]
pub struct IngestDiagnostics {
    /// Marketplaces located per metric, before EU5 derivation.
    pub parsed: BTreeMap<Metric, Vec<Marketplace>>,
    /// Metrics with no locatable section.
    pub missing: Vec<Metric>,
    /// Length of the shared week axis.
    pub week_count: usize,
}

/// Summary statistics over the clean values of one series.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStatistics {
    pub total: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub last_4_week_avg: f64,
    pub std_dev: f64,
}

/// Presentation payload for one series: full axis, nulls preserved.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesPayload {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
    /// Rendered business-week labels.
    pub weeks: Vec<String>,
    /// Labels as they appeared in the sheet.
    pub week_labels: Vec<String>,
}

/// One ingested sheet of metric sections on a shared week axis.
#[derive(Debug, Clone, Default)]
pub struct MetricStore {
    weeks: Vec<String>,
    dates: Vec<Option<NaiveDate>>,
    data: BTreeMap<Metric, BTreeMap<Marketplace, Vec<Option<f64>>>>,
}

impl MetricStore {
    /// Ingest one sheet: locate every known metric section, backfill the
    /// derived metric from its drivers, then recompute EU5. Fails only when
    /// no section at all can be located.
    pub fn ingest(grid: &Grid) -> Result<(MetricStore, IngestDiagnostics)> {
        let mut store = MetricStore::default();
        let mut diagnostics = IngestDiagnostics::default();

        for metric in Metric::ALL {
            match locate_metric_section(grid, metric) {
                Some(section) => {
                    if store.weeks.is_empty() {
                        store.dates = section.weeks.iter().map(|w| parse_week_label(w)).collect();
                        store.weeks = section.weeks.clone();
                    }
                    diagnostics
                        .parsed
                        .insert(metric, section.rows.keys().copied().collect());
                    store.data.insert(metric, section.rows);
                }
                None => diagnostics.missing.push(metric),
            }
        }

        if store.data.is_empty() {
            return Err(DataError::ParseError(
                "no metric sections found in sheet".to_string(),
            ));
        }

        diagnostics.week_count = store.weeks.len();
        store.reconcile_net_ordered_units();
        store.derive_eu5();
        debug!(
            metrics = store.data.len(),
            weeks = store.weeks.len(),
            "store ingested"
        );
        Ok((store, diagnostics))
    }

    /// The shared week axis, as labelled in the sheet.
    pub fn weeks(&self) -> &[String] {
        &self.weeks
    }

    /// Raw value row for a metric × marketplace, if present.
    pub fn series(&self, metric: Metric, marketplace: Marketplace) -> Option<&[Option<f64>]> {
        self.data
            .get(&metric)
            .and_then(|rows| rows.get(&marketplace))
            .map(Vec::as_slice)
    }

    /// Metrics with at least one located row.
    pub fn metrics(&self) -> Vec<Metric> {
        self.data.keys().copied().collect()
    }

    /// Clean observation rows: dated, valued, sheet order preserved.
    pub fn clean_table(&self, metric: Metric, marketplace: Marketplace) -> Vec<ObservedPoint> {
        let Some(values) = self.series(metric, marketplace) else {
            return Vec::new();
        };
        let len = values.len().min(self.weeks.len());
        (0..len)
            .filter_map(|i| {
                let date = self.dates[i]?;
                let value = values[i]?;
                Some(ObservedPoint {
                    date,
                    value,
                    label: self.weeks[i].clone(),
                })
            })
            .collect()
    }

    /// Highest clean value ever observed for the series, used by the
    /// forecast caps.
    pub fn historical_max(&self, metric: Metric, marketplace: Marketplace) -> Option<f64> {
        self.clean_table(metric, marketplace)
            .iter()
            .map(|p| p.value)
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    /// Summary statistics over the clean values, `None` when empty.
    pub fn summary_statistics(
        &self,
        metric: Metric,
        marketplace: Marketplace,
    ) -> Option<SummaryStatistics> {
        let values: Vec<f64> = self
            .clean_table(metric, marketplace)
            .iter()
            .map(|p| p.value)
            .collect();
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let total: f64 = values.iter().sum();
        let average = total / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let last_4_week_avg = if count >= 4 {
            values[count - 4..].iter().sum::<f64>() / 4.0
        } else {
            average
        };
        let std_dev = if count > 1 {
            let variance = values
                .iter()
                .map(|v| (v - average).powi(2))
                .sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Some(SummaryStatistics {
            total,
            average,
            min,
            max,
            count,
            last_4_week_avg,
            std_dev,
        })
    }

    /// Presentation payload for one series: every dated week on the axis,
    /// with missing values preserved as nulls.
    pub fn series_payload(
        &self,
        metric: Metric,
        marketplace: Marketplace,
    ) -> Option<SeriesPayload> {
        let values = self.series(metric, marketplace)?;
        let len = values.len().min(self.weeks.len());

        let mut payload = SeriesPayload {
            dates: Vec::new(),
            values: Vec::new(),
            weeks: Vec::new(),
            week_labels: Vec::new(),
        };
        for i in 0..len {
            let Some(date) = self.dates[i] else { continue };
            payload.dates.push(date);
            payload.values.push(values[i]);
            payload.weeks.push(format_week_label(date));
            payload.week_labels.push(self.weeks[i].clone());
        }
        (!payload.dates.is_empty()).then_some(payload)
    }

    /// Payloads for every populated metric × marketplace pair, keyed by
    /// canonical labels.
    pub fn all_payloads(&self) -> BTreeMap<String, BTreeMap<String, SeriesPayload>> {
        let mut out = BTreeMap::new();
        for metric in Metric::ALL {
            let mut per_mp = BTreeMap::new();
            for marketplace in Marketplace::ALL {
                if let Some(payload) = self.series_payload(metric, marketplace) {
                    per_mp.insert(marketplace.code().to_string(), payload);
                }
            }
            if !per_mp.is_empty() {
                out.insert(metric.label().to_string(), per_mp);
            }
        }
        out
    }

    /// Backfill missing national Net Ordered Units values as the product of
    /// the three drivers for the same week. A recorded value always wins
    /// over the recomputation. Runs before EU5 derivation so the aggregate
    /// sums over backfilled nationals.
    fn reconcile_net_ordered_units(&mut self) {
        for marketplace in Marketplace::NATIONAL {
            let product_len = Metric::DRIVERS
                .iter()
                .filter_map(|m| self.series(*m, marketplace).map(|s| s.len()))
                .min();
            let Some(product_len) = product_len else {
                continue;
            };
            if Metric::DRIVERS
                .iter()
                .any(|m| self.series(*m, marketplace).is_none())
            {
                continue;
            }

            let products: Vec<Option<f64>> = (0..product_len)
                .map(|i| {
                    let transits = self.series(Metric::Transits, marketplace)?[i]?;
                    let conversion = self.series(Metric::TransitConversion, marketplace)?[i]?;
                    let upo = self.series(Metric::Upo, marketplace)?[i]?;
                    Some(transits * conversion * upo)
                })
                .collect();

            let rows = self.data.entry(Metric::NetOrderedUnits).or_default();
            let recorded = rows.entry(marketplace).or_default();
            if recorded.len() < product_len {
                recorded.resize(product_len, None);
            }
            let mut backfilled = 0usize;
            for (slot, product) in recorded.iter_mut().zip(products) {
                if slot.is_none() && product.is_some() {
                    *slot = product;
                    backfilled += 1;
                }
            }
            if backfilled > 0 {
                debug!(marketplace = %marketplace, backfilled, "net ordered units backfilled");
            }
        }
    }

    /// Recompute the EU5 row for every metric from the national rows.
    ///
    /// Counts sum across nationals with missing treated as 0, defined once
    /// any national is present; rates average only over the nationals that
    /// have a value, with zero contributors leaving the week undefined.
    /// Totals and rates encode different business semantics and the two
    /// branches must not be unified.
    fn derive_eu5(&mut self) {
        for metric in Metric::ALL {
            let Some(rows) = self.data.get(&metric) else {
                continue;
            };
            let max_len = Marketplace::NATIONAL
                .iter()
                .filter_map(|mp| rows.get(mp).map(Vec::len))
                .max()
                .unwrap_or(0);
            if max_len == 0 {
                continue;
            }

            let mut eu5 = vec![None; max_len];
            for i in 0..max_len {
                let present: Vec<f64> = Marketplace::NATIONAL
                    .iter()
                    .filter_map(|mp| rows.get(mp).and_then(|v| *v.get(i)?))
                    .collect();
                if present.is_empty() {
                    continue;
                }
                let sum: f64 = present.iter().sum();
                eu5[i] = if metric.is_rate() {
                    Some(sum / present.len() as f64)
                } else {
                    Some(sum)
                };
            }

            if let Some(rows) = self.data.get_mut(&metric) {
                rows.insert(Marketplace::Eu5, eu5);
            }
        }
    }
}

/// One ingested snapshot: actuals plus the optional manual forecast and
/// promo scores. Concurrent datasets are simply multiple `Dataset` values.
#[derive(Debug, Clone)]
pub struct Dataset {
    actuals: MetricStore,
    manual_forecast: Option<MetricStore>,
    promo: Option<PromoScores>,
}

impl Dataset {
    /// Wrap an already ingested actuals store.
    pub fn new(actuals: MetricStore) -> Self {
        Self {
            actuals,
            manual_forecast: None,
            promo: None,
        }
    }

    /// Attach a manual-forecast store.
    pub fn with_manual_forecast(mut self, store: MetricStore) -> Self {
        self.manual_forecast = Some(store);
        self
    }

    /// Attach promo scores.
    pub fn with_promo_scores(mut self, promo: PromoScores) -> Self {
        self.promo = Some(promo);
        self
    }

    /// Build a dataset from a workbook: the actuals sheet is required, the
    /// forecast and promo sheets are optional and fail soft.
    pub fn from_workbook(workbook: &Workbook) -> Result<(Dataset, IngestDiagnostics)> {
        let grid = workbook.actuals_sheet().ok_or_else(|| {
            DataError::ValidationError("workbook contains no sheets".to_string())
        })?;
        let (actuals, diagnostics) = MetricStore::ingest(grid)?;

        let manual_forecast = workbook.forecast_sheet().and_then(|g| {
            match MetricStore::ingest(g) {
                Ok((store, _)) => Some(store),
                Err(e) => {
                    warn!(error = %e, "forecast sheet present but unparseable");
                    None
                }
            }
        });

        let promo = workbook.promo_sheet().and_then(|g| {
            let parsed = parse_promo_grid(g);
            if parsed.is_none() {
                warn!("promo sheet present but unparseable");
            }
            parsed
        });

        let mut dataset = Dataset::new(actuals);
        if let Some(store) = manual_forecast {
            dataset = dataset.with_manual_forecast(store);
        }
        if let Some(promo) = promo {
            dataset = dataset.with_promo_scores(promo);
        }
        Ok((dataset, diagnostics))
    }

    /// The actuals store.
    pub fn actuals(&self) -> &MetricStore {
        &self.actuals
    }

    /// The manual-forecast store, if one was loaded.
    pub fn manual_forecast(&self) -> Option<&MetricStore> {
        self.manual_forecast.as_ref()
    }

    /// Whether a manual forecast is loaded.
    pub fn has_manual_forecast(&self) -> bool {
        self.manual_forecast.is_some()
    }

    /// Promo scores, if loaded.
    pub fn promo_scores(&self) -> Option<&PromoScores> {
        self.promo.as_ref()
    }
}
