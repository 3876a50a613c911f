//! Heuristic metric-section locator
//!
//! Sheets carry several metric tables at arbitrary offsets: a metric title
//! cell, an "MP" header row whose right-hand columns are week labels, then
//! one row per marketplace. The scan is an explicit state machine over grid
//! coordinates so the heuristic stays testable in isolation:
//!
//! SeekMetric → SeekHeader → SeekWeeks → SeekRows → section / absent

use crate::grid::Grid;
use crate::keys::{Marketplace, Metric};
use crate::week::parse_week_label;
use std::collections::BTreeMap;
use tracing::debug;

/// Marker text of the header cell that anchors a section.
const MP_HEADER: &str = "MP";
/// Rows below the metric title searched for the MP header.
const HEADER_LOOKAHEAD_ROWS: usize = 2;
/// Consecutive blank header cells tolerated while walking week columns.
const MAX_BLANK_HEADER_COLS: usize = 100;
/// Rows below the MP header searched for marketplace rows.
const ROW_LOOKAHEAD: usize = 10;

/// A week column: its label plus the absolute grid column it lives in, so
/// blank gaps in the header can never shift value alignment.
#[derive(Debug, Clone)]
struct WeekColumn {
    col: usize,
    label: String,
}

/// One located metric section.
#[derive(Debug, Clone)]
pub struct MetricSection {
    /// Week labels shared by every row of the section, in column order.
    pub weeks: Vec<String>,
    /// Per-marketplace values, one slot per week column; missing cells are
    /// `None`, never zero.
    pub rows: BTreeMap<Marketplace, Vec<Option<f64>>>,
}

enum ScanState {
    SeekMetric,
    SeekHeader {
        metric_row: usize,
    },
    SeekWeeks {
        header_row: usize,
        label_col: usize,
    },
    SeekRows {
        header_row: usize,
        label_col: usize,
        weeks: Vec<WeekColumn>,
    },
}

/// Locate one contiguous section for `metric`, or `None` when the title,
/// header, week columns, or marketplace rows cannot be found (soft failure).
pub fn locate_metric_section(grid: &Grid, metric: Metric) -> Option<MetricSection> {
    let mut state = ScanState::SeekMetric;

    loop {
        state = match state {
            ScanState::SeekMetric => match find_cell(grid, metric.label()) {
                Some((row, col)) => {
                    debug!(metric = %metric, row, col, "metric title found");
                    ScanState::SeekHeader { metric_row: row }
                }
                None => {
                    debug!(metric = %metric, "metric title not found");
                    return None;
                }
            },

            ScanState::SeekHeader { metric_row } => {
                let last = (metric_row + HEADER_LOOKAHEAD_ROWS).min(grid.rows().saturating_sub(1));
                let mut found = None;
                'rows: for row in (metric_row + 1)..=last {
                    for col in 0..grid.cols() {
                        if grid.trimmed(row, col) == Some(MP_HEADER) {
                            found = Some((row, col));
                            break 'rows;
                        }
                    }
                }
                match found {
                    Some((header_row, label_col)) => ScanState::SeekWeeks {
                        header_row,
                        label_col,
                    },
                    None => {
                        debug!(metric = %metric, "MP header not found");
                        return None;
                    }
                }
            }

            ScanState::SeekWeeks {
                header_row,
                label_col,
            } => {
                let mut weeks = Vec::new();
                let mut blanks = 0usize;
                for col in (label_col + 1)..grid.cols() {
                    match grid.trimmed(header_row, col) {
                        Some(text) => {
                            if parse_week_label(text).is_none() {
                                // First non-week header ends the axis.
                                break;
                            }
                            weeks.push(WeekColumn {
                                col,
                                label: text.to_string(),
                            });
                            blanks = 0;
                        }
                        None => {
                            blanks += 1;
                            if blanks > MAX_BLANK_HEADER_COLS {
                                break;
                            }
                        }
                    }
                }
                if weeks.is_empty() {
                    debug!(metric = %metric, "no week columns found");
                    return None;
                }
                ScanState::SeekRows {
                    header_row,
                    label_col,
                    weeks,
                }
            }

            ScanState::SeekRows {
                header_row,
                label_col,
                weeks,
            } => {
                let mut rows = BTreeMap::new();
                let last = (header_row + ROW_LOOKAHEAD).min(grid.rows().saturating_sub(1));
                for row in (header_row + 1)..=last {
                    let Some(label) = grid.trimmed(row, label_col) else {
                        continue;
                    };
                    if let Some(marketplace) = Marketplace::from_code(label) {
                        let values = weeks
                            .iter()
                            .map(|week| grid.cell(row, week.col).as_number())
                            .collect();
                        rows.insert(marketplace, values);
                    } else if Metric::from_label(label).is_some() {
                        // Next metric section starts here.
                        break;
                    }
                }
                if rows.is_empty() {
                    debug!(metric = %metric, "no marketplace rows found");
                    return None;
                }
                debug!(
                    metric = %metric,
                    weeks = weeks.len(),
                    marketplaces = rows.len(),
                    "section located"
                );
                return Some(MetricSection {
                    weeks: weeks.into_iter().map(|w| w.label).collect(),
                    rows,
                });
            }
        };
    }
}

/// First cell whose trimmed text equals `needle`, in row-major order.
fn find_cell(grid: &Grid, needle: &str) -> Option<(usize, usize)> {
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            if grid.trimmed(row, col) == Some(needle) {
                return Some((row, col));
            }
        }
    }
    None
}
