use chrono::{Datelike, NaiveDate, Weekday};
use haul_data::week::{
    format_week_label, parse_week_label, parse_week_label_with_default_year,
};
use rstest::rstest;

#[rstest]
#[case("Wk01 2025", 1, 2025)]
#[case("Wk19 2025", 19, 2025)]
#[case("wk33 2024", 33, 2024)]
#[case("Wk 7 2026", 7, 2026)]
#[case("Wk52 2023", 52, 2023)]
fn test_round_trip_reproduces_week_and_year(
    #[case] label: &str,
    #[case] week: u32,
    #[case] year: i32,
) {
    let date = parse_week_label(label).expect("label should parse");
    let rendered = format_week_label(date);
    assert_eq!(rendered, format!("Wk{week:02} {year}"));
}

#[test]
fn test_parse_anchors_on_monday() {
    for week in 1..=52u32 {
        let label = format!("Wk{week:02} 2025");
        let date = parse_week_label(&label).unwrap();
        assert_eq!(date.weekday(), Weekday::Mon, "{label} not a Monday");
    }
}

#[test]
fn test_wk5_2026_scenario() {
    // "Wk 5 2026" parses to the Monday of ISO week 5, 2026 and re-renders
    // as the zero-padded canonical label.
    let date = parse_week_label("Wk 5 2026").unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 26).unwrap());
    assert_eq!(date.iso_week().week(), 5);
    assert_eq!(format_week_label(date), "Wk05 2026");
}

#[rstest]
#[case("")]
#[case("Total")]
#[case("Week 19 2025")]
#[case("Wk")]
#[case("Wk19 25")]
#[case("2025")]
fn test_malformed_labels_return_none(#[case] label: &str) {
    assert_eq!(parse_week_label(label), None);
}

#[test]
fn test_default_year_applies_only_when_year_absent() {
    let with_default = parse_week_label_with_default_year("Wk10", Some(2025)).unwrap();
    let explicit = parse_week_label("Wk10 2025").unwrap();
    assert_eq!(with_default, explicit);

    // An explicit year always wins over the default.
    let other = parse_week_label_with_default_year("Wk10 2024", Some(2025)).unwrap();
    assert_eq!(other, parse_week_label("Wk10 2024").unwrap());
}

#[test]
fn test_year_first_normalization() {
    assert_eq!(
        parse_week_label("2026wk1"),
        parse_week_label("Wk01 2026")
    );
    assert_eq!(
        parse_week_label("2026 wk1"),
        parse_week_label("Wk01 2026")
    );
}
