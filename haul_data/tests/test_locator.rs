use haul_data::grid::{Cell, Grid};
use haul_data::keys::{Marketplace, Metric};
use haul_data::locator::locate_metric_section;
use pretty_assertions::assert_eq;

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

fn num(v: f64) -> Cell {
    Cell::Number(v)
}

/// Header row with `count` week labels starting at Wk01 2025.
fn week_header(count: usize) -> Vec<Cell> {
    let mut row = vec![text("MP")];
    for week in 1..=count {
        row.push(text(&format!("Wk{week:02} 2025")));
    }
    row
}

#[test]
fn test_blank_gap_then_text_yields_exactly_ten_weeks() {
    // Wk01..Wk10 2025, five blank columns, then non-week text: the scan
    // tolerates the blanks but the text column ends the axis at 10 weeks.
    let mut header = week_header(10);
    for _ in 0..5 {
        header.push(Cell::Empty);
    }
    header.push(text("Notes"));

    let mut uk_row = vec![text("UK")];
    uk_row.extend((0..10).map(|i| num(100.0 + i as f64)));

    let grid = Grid::new(vec![vec![text("Transits")], header, uk_row]);
    let section = locate_metric_section(&grid, Metric::Transits).unwrap();

    assert_eq!(section.weeks.len(), 10);
    assert_eq!(section.weeks[0], "Wk01 2025");
    assert_eq!(section.weeks[9], "Wk10 2025");
    assert_eq!(section.rows[&Marketplace::Uk].len(), 10);
}

#[test]
fn test_values_stay_aligned_across_blank_gap() {
    // A blank header column between two week columns must not shift the
    // values read for the later week.
    let grid = Grid::new(vec![
        vec![text("UPO")],
        vec![
            text("MP"),
            text("Wk01 2025"),
            Cell::Empty,
            text("Wk02 2025"),
        ],
        vec![text("DE"), num(1.5), num(99.0), num(2.5)],
    ]);
    let section = locate_metric_section(&grid, Metric::Upo).unwrap();
    assert_eq!(section.weeks, vec!["Wk01 2025", "Wk02 2025"]);
    assert_eq!(section.rows[&Marketplace::De], vec![Some(1.5), Some(2.5)]);
}

#[test]
fn test_full_sheet_with_stacked_sections() {
    // Two sections at different offsets, with a gap row between them and
    // corrupted placeholder cells inside.
    let grid = Grid::new(vec![
        vec![Cell::Empty],
        vec![text("Net Ordered Units")],
        vec![text("MP"), text("Wk01 2025"), text("Wk02 2025")],
        vec![text("UK"), num(1000.0), text("[object Object]")],
        vec![text("DE"), text("nan"), num(2000.0)],
        vec![Cell::Empty],
        vec![text("Transits")],
        vec![text("MP"), text("Wk01 2025"), text("Wk02 2025")],
        vec![text("UK"), num(50_000.0), num(52_000.0)],
    ]);

    let nou = locate_metric_section(&grid, Metric::NetOrderedUnits).unwrap();
    assert_eq!(nou.rows[&Marketplace::Uk], vec![Some(1000.0), None]);
    assert_eq!(nou.rows[&Marketplace::De], vec![None, Some(2000.0)]);
    // The first section stops before the Transits rows.
    assert!(!nou.rows.contains_key(&Marketplace::Fr));

    let transits = locate_metric_section(&grid, Metric::Transits).unwrap();
    assert_eq!(
        transits.rows[&Marketplace::Uk],
        vec![Some(50_000.0), Some(52_000.0)]
    );
}

#[test]
fn test_soft_failures() {
    // No week columns: header exists but every column is junk text.
    let grid = Grid::new(vec![
        vec![text("Transits")],
        vec![text("MP"), text("Total"), text("Average")],
        vec![text("UK"), num(1.0), num(2.0)],
    ]);
    assert!(locate_metric_section(&grid, Metric::Transits).is_none());

    // No marketplace rows under the header.
    let grid = Grid::new(vec![
        vec![text("Transits")],
        vec![text("MP"), text("Wk01 2025")],
        vec![text("Totals"), num(1.0)],
    ]);
    assert!(locate_metric_section(&grid, Metric::Transits).is_none());

    // MP header too far below the title.
    let grid = Grid::new(vec![
        vec![text("Transits")],
        vec![Cell::Empty],
        vec![Cell::Empty],
        vec![text("MP"), text("Wk01 2025")],
        vec![text("UK"), num(1.0)],
    ]);
    assert!(locate_metric_section(&grid, Metric::Transits).is_none());
}

#[test]
fn test_row_lookahead_bound() {
    // Marketplace rows beyond the lookahead window are not collected.
    let mut rows = vec![vec![text("Transits")], week_header(2)];
    for _ in 0..10 {
        rows.push(vec![Cell::Empty]);
    }
    rows.push(vec![text("UK"), num(1.0), num(2.0)]);
    let grid = Grid::new(rows);
    assert!(locate_metric_section(&grid, Metric::Transits).is_none());
}
