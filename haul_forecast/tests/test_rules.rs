use chrono::{Duration, NaiveDate};
use haul_forecast::models::{ForecastResult, ModelInfo};
use haul_forecast::rules::{
    apply_promo_floor, cap_transit_conversion, cap_transits, cap_upo,
    compose_net_ordered_units, MAX_TRANSIT_CONVERSION,
};

fn forecast(values: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> ForecastResult {
    let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    ForecastResult {
        dates: (0..values.len())
            .map(|i| start + Duration::weeks(i as i64))
            .collect(),
        values,
        lower_bound: lower,
        upper_bound: upper,
        model: "SARIMAX".to_string(),
        model_info: ModelInfo::default(),
        promo_info: None,
        cap_info: None,
    }
}

fn uniform(values: &[f64]) -> ForecastResult {
    forecast(
        values.to_vec(),
        values.iter().map(|v| v * 0.9).collect(),
        values.iter().map(|v| v * 1.1).collect(),
    )
}

#[test]
fn test_conversion_never_exceeds_cap_anywhere() {
    let mut fc = forecast(
        vec![0.08, 0.15, 0.11, 0.02],
        vec![0.06, 0.12, 0.09, 0.01],
        vec![0.11, 0.19, 0.14, 0.04],
    );
    cap_transit_conversion(&mut fc);

    for i in 0..fc.len() {
        assert!(fc.values[i] <= MAX_TRANSIT_CONVERSION);
        assert!(fc.lower_bound[i] <= MAX_TRANSIT_CONVERSION);
        assert!(fc.upper_bound[i] <= MAX_TRANSIT_CONVERSION);
    }
    assert_eq!(fc.cap_info.as_ref().unwrap().capped_weeks, 2);
    assert!(fc.model.ends_with("(Capped)"));
}

#[test]
fn test_derived_metric_equals_product_of_capped_drivers() {
    // Drivers with values that will be clamped by their caps first.
    let mut transits = uniform(&[900.0, 1500.0, 700.0]);
    let mut conversion = uniform(&[0.09, 0.20, 0.05]);
    let mut upo = uniform(&[1.8, 5.0, 2.1]);

    cap_transits(&mut transits, Some(300.0), Some(1000.0));
    cap_transit_conversion(&mut conversion);
    cap_upo(&mut upo, Some(2.0));

    let nou = compose_net_ordered_units(&transits, &conversion, &upo);
    for i in 0..nou.len() {
        let expected = transits.values[i] * conversion.values[i] * upo.values[i];
        assert!((nou.values[i] - expected.max(0.0)).abs() < 1e-9);
        let expected_lower =
            transits.lower_bound[i] * conversion.lower_bound[i] * upo.lower_bound[i];
        assert!((nou.lower_bound[i] - expected_lower.max(0.0)).abs() < 1e-9);
        let expected_upper =
            transits.upper_bound[i] * conversion.upper_bound[i] * upo.upper_bound[i];
        assert!((nou.upper_bound[i] - expected_upper.max(0.0)).abs() < 1e-9);
    }
    assert_eq!(nou.model, "Calculated (T×C×U)");
    let info = nou.model_info.source_models.as_ref().unwrap();
    assert_eq!(info["Transits"], "SARIMAX (Capped)");
}

#[test]
fn test_promo_floor_blended_never_below_baseline_on_promo_weeks() {
    let baseline = uniform(&[100.0, 200.0, 150.0, 120.0]);
    let mut blended = uniform(&[80.0, 260.0, 150.0, 90.0]);
    let scores = [1.5, 2.0, 3.0, 4.0];

    apply_promo_floor(&mut blended, &baseline, &scores);
    for i in 0..blended.len() {
        assert!(
            blended.values[i] >= baseline.values[i],
            "week {i}: promo week fell below baseline"
        );
        assert!(blended.lower_bound[i] >= baseline.lower_bound[i]);
        assert!(blended.upper_bound[i] >= baseline.upper_bound[i]);
    }
}

#[test]
fn test_promo_floor_counts_and_label() {
    let baseline = uniform(&[100.0, 100.0, 100.0]);
    let mut blended = uniform(&[90.0, 110.0, 105.0]);
    apply_promo_floor(&mut blended, &baseline, &[2.0, 1.0, 0.5]);

    let info = blended.promo_info.as_ref().unwrap();
    // Week 0 floored up, week 1 forced to baseline, week 2 left alone.
    assert_eq!(info.floor_applied_weeks, 1);
    assert_eq!(info.baseline_used_weeks, 1);
    assert_eq!(blended.values, vec![100.0, 100.0, 105.0]);
    assert!(blended.model.ends_with("+Promo"));
}

#[test]
fn test_promo_floor_noop_keeps_label() {
    let baseline = uniform(&[100.0]);
    let mut blended = uniform(&[120.0]);
    // A single strong-promo week that already beats baseline changes
    // nothing and earns no suffix.
    apply_promo_floor(&mut blended, &baseline, &[2.0]);
    assert_eq!(blended.model, "SARIMAX");
    let info = blended.promo_info.as_ref().unwrap();
    assert_eq!(info.floor_applied_weeks, 0);
    assert_eq!(info.baseline_used_weeks, 0);
}
