use approx::assert_relative_eq;
use haul_data::grid::{Cell, Grid};
use haul_data::keys::{Marketplace, Metric};
use haul_data::store::{Dataset, MetricStore};
use haul_forecast::accuracy::{deviation_table, score, score_all, Timeframe};

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

fn num(v: f64) -> Cell {
    Cell::Number(v)
}

/// Build a single-metric store over the given weekly UK values.
fn uk_store(metric: &str, values: &[Option<f64>]) -> MetricStore {
    let mut header = vec![text("MP")];
    for week in 1..=values.len() {
        header.push(text(&format!("Wk{week:02} 2025")));
    }
    let mut uk_row = vec![text("UK")];
    for value in values {
        uk_row.push(match value {
            Some(v) => num(*v),
            None => Cell::Empty,
        });
    }
    let grid = Grid::new(vec![vec![text(metric)], header, uk_row]);
    MetricStore::ingest(&grid).unwrap().0
}

fn dataset(actuals: &[Option<f64>], forecast: &[Option<f64>]) -> Dataset {
    Dataset::new(uk_store("Transits", actuals))
        .with_manual_forecast(uk_store("Transits", forecast))
}

#[test]
fn test_no_manual_forecast_scores_none() {
    let ds = Dataset::new(uk_store("Transits", &[Some(100.0); 4]));
    assert!(score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).is_none());
}

#[test]
fn test_perfect_forecast_scores_perfectly() {
    let values = [Some(100.0), Some(120.0), Some(90.0), Some(110.0)];
    let ds = dataset(&values, &values);
    let record = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).unwrap();
    assert_relative_eq!(record.mape, 0.0, epsilon = 1e-12);
    assert_relative_eq!(record.wmape, 0.0, epsilon = 1e-12);
    assert_relative_eq!(record.bias, 0.0, epsilon = 1e-12);
    assert_relative_eq!(record.accuracy, 100.0, epsilon = 1e-12);
    assert_eq!(record.overlap_count, 4);
}

#[test]
fn test_known_errors() {
    // Actuals 100 each week; forecast overshoots by 10 then undershoots by 10.
    let actuals = [Some(100.0), Some(100.0)];
    let forecast = [Some(110.0), Some(90.0)];
    let ds = dataset(&actuals, &forecast);
    let record = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).unwrap();

    assert_relative_eq!(record.mape, 10.0, epsilon = 1e-9);
    assert_relative_eq!(record.wmape, 10.0, epsilon = 1e-9);
    // Bias cancels: +10 − 10 over 200 actuals.
    assert_relative_eq!(record.bias, 0.0, epsilon = 1e-9);
    assert_relative_eq!(record.accuracy, 90.0, epsilon = 1e-9);
}

#[test]
fn test_accuracy_bounds() {
    // Wildly wrong forecast: WMAPE far above 100, accuracy clamps to 0.
    let actuals = [Some(10.0), Some(10.0), Some(10.0), Some(10.0)];
    let forecast = [Some(100.0), Some(100.0), Some(100.0), Some(100.0)];
    let ds = dataset(&actuals, &forecast);
    let record = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).unwrap();
    assert!(record.wmape >= 0.0);
    assert_eq!(record.accuracy, 0.0);
    assert!(record.bias > 0.0);
}

#[test]
fn test_timeframes_slice_joined_rows() {
    let actuals = [
        Some(100.0),
        Some(100.0),
        Some(100.0),
        Some(100.0),
        Some(100.0),
        Some(100.0),
    ];
    // Early weeks are terrible, late weeks perfect.
    let forecast = [
        Some(200.0),
        Some(200.0),
        Some(100.0),
        Some(100.0),
        Some(100.0),
        Some(100.0),
    ];
    let ds = dataset(&actuals, &forecast);

    let all = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).unwrap();
    assert_eq!(all.overlap_count, 6);
    assert!(all.wmape > 0.0);

    let trailing = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::Trailing4).unwrap();
    assert_eq!(trailing.overlap_count, 4);
    assert_relative_eq!(trailing.wmape, 0.0, epsilon = 1e-12);

    let current = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::CurrentWeek).unwrap();
    assert_eq!(current.overlap_count, 1);
    assert_relative_eq!(current.accuracy, 100.0, epsilon = 1e-12);
}

#[test]
fn test_zero_actual_guard() {
    // Single overlapping week with actual 0: nothing to score.
    let ds = dataset(&[Some(0.0)], &[Some(5.0)]);
    assert!(score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).is_none());

    // Zero-actual weeks are excluded but the rest still score.
    let ds = dataset(&[Some(0.0), Some(100.0)], &[Some(5.0), Some(110.0)]);
    let record = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).unwrap();
    assert_eq!(record.overlap_count, 1);
    assert_relative_eq!(record.mape, 10.0, epsilon = 1e-9);
}

#[test]
fn test_partial_overlap_joins_by_date() {
    // Forecast misses the middle week; only dated intersections join.
    let actuals = [Some(100.0), Some(100.0), Some(100.0), Some(100.0)];
    let forecast = [Some(100.0), None, Some(100.0), None];
    let ds = dataset(&actuals, &forecast);
    let record = score(&ds, Metric::Transits, Marketplace::Uk, Timeframe::All).unwrap();
    assert_eq!(record.overlap_count, 2);
}

#[test]
fn test_score_all_keys() {
    let values = [Some(100.0), Some(110.0)];
    let ds = dataset(&values, &values);
    let all = score_all(&ds, Timeframe::All);
    assert!(all["Transits"].contains_key("UK"));
    // EU5 derives from the single national, so it scores too.
    assert!(all["Transits"].contains_key("EU5"));
}

#[test]
fn test_deviation_table() {
    let ds = dataset(&[Some(100.0), Some(120.0)], &[Some(110.0), Some(100.0)]);
    let table = deviation_table(&ds, Metric::Transits, Marketplace::Uk).unwrap();
    assert_eq!(table.total_weeks, 2);
    assert_eq!(table.manual_forecast_weeks, 2);

    let first = &table.rows[0];
    assert_relative_eq!(first.manual_dev.unwrap(), -10.0, epsilon = 1e-9);
    assert_relative_eq!(first.manual_dev_pct.unwrap(), -10.0 / 110.0 * 100.0, epsilon = 1e-9);

    // Average absolute deviation over both weeks.
    assert!(table.manual_avg_abs_dev_pct.unwrap() > 0.0);
}
