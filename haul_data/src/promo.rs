//! Promotional intensity scores
//!
//! A promo score is a positive multiplier per marketplace-week; 1.0 means
//! no promotion. Scores come from an optional sheet laid out like a metric
//! section (an "MP" header row with week columns), with week labels allowed
//! to omit the year. An optional "Campaigns" section of the same shape
//! supplies free-text descriptions.

use crate::grid::Grid;
use crate::keys::Marketplace;
use crate::week::{format_week_label, parse_week_label_with_default_year};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Year assumed when a promo week label carries none.
pub const DEFAULT_PROMO_YEAR: i32 = 2025;

/// Title cell of the optional campaign-description section.
const CAMPAIGNS_TITLE: &str = "Campaigns";
/// Marker text of the header cell that anchors a section.
const MP_HEADER: &str = "MP";
/// Rows below a title searched for the MP header.
const HEADER_LOOKAHEAD_ROWS: usize = 2;
/// Rows below the MP header searched for marketplace rows.
const ROW_LOOKAHEAD: usize = 10;

/// Display band for a promo intensity score.
pub fn band(score: f64) -> &'static str {
    if score <= 1.0 {
        "No/Low"
    } else if score <= 2.0 {
        "Light"
    } else if score <= 3.0 {
        "Medium"
    } else {
        "Strong"
    }
}

/// One week's promo entry in the presentation payload.
#[derive(Debug, Clone, Serialize)]
pub struct PromoWeek {
    pub week: String,
    pub score: f64,
    pub band: &'static str,
    pub description: Option<String>,
}

/// Promo intensity scores keyed by marketplace × canonical week label.
#[derive(Debug, Clone, Default)]
pub struct PromoScores {
    scores: BTreeMap<Marketplace, BTreeMap<String, f64>>,
    descriptions: BTreeMap<Marketplace, BTreeMap<String, String>>,
}

impl PromoScores {
    /// Score for a marketplace-week, if one was authored. The label is
    /// canonicalized the same way sheet labels were, so "Wk19" (default
    /// year) and "Wk19 2025" address the same entry.
    pub fn score_for(&self, marketplace: Marketplace, week_label: &str) -> Option<f64> {
        let key = canonical_label(week_label)?;
        self.scores.get(&marketplace)?.get(&key).copied()
    }

    /// Campaign description for a marketplace-week, if any.
    pub fn description_for(&self, marketplace: Marketplace, week_label: &str) -> Option<&str> {
        let key = canonical_label(week_label)?;
        self.descriptions
            .get(&marketplace)?
            .get(&key)
            .map(String::as_str)
    }

    /// All scores for one marketplace, keyed by canonical week label.
    pub fn scores_for(&self, marketplace: Marketplace) -> Option<&BTreeMap<String, f64>> {
        self.scores.get(&marketplace)
    }

    /// Marketplaces with at least one score.
    pub fn marketplaces(&self) -> Vec<Marketplace> {
        self.scores.keys().copied().collect()
    }

    /// Presentation table: per marketplace, each scored week with its band
    /// and any campaign description.
    pub fn table(&self) -> BTreeMap<String, Vec<PromoWeek>> {
        let mut out = BTreeMap::new();
        for (marketplace, weeks) in &self.scores {
            let rows: Vec<PromoWeek> = weeks
                .iter()
                .map(|(week, &score)| PromoWeek {
                    week: week.clone(),
                    score,
                    band: band(score),
                    description: self
                        .descriptions
                        .get(marketplace)
                        .and_then(|d| d.get(week))
                        .cloned(),
                })
                .collect();
            out.insert(marketplace.code().to_string(), rows);
        }
        out
    }
}

/// Canonical form of a promo week label: parse (defaulting the year) and
/// re-render, so lookups by rendered label always hit.
fn canonical_label(label: &str) -> Option<String> {
    parse_week_label_with_default_year(label, Some(DEFAULT_PROMO_YEAR)).map(format_week_label)
}

/// Parse the promo sheet. Returns `None` when no MP header with week
/// columns and marketplace rows can be found (soft failure).
pub fn parse_promo_grid(grid: &Grid) -> Option<PromoScores> {
    let (header_row, label_col, weeks) = find_week_header(grid, 0, grid.rows())?;

    let mut promo = PromoScores::default();
    for (marketplace, row) in marketplace_rows(grid, header_row, label_col) {
        let entries: BTreeMap<String, f64> = weeks
            .iter()
            .filter_map(|(col, key)| {
                let score = grid.cell(row, *col).as_number()?;
                // Scores are positive multipliers; anything else is noise.
                (score > 0.0).then(|| (key.clone(), score))
            })
            .collect();
        if !entries.is_empty() {
            promo.scores.insert(marketplace, entries);
        }
    }
    if promo.scores.is_empty() {
        return None;
    }

    // Optional campaign descriptions, same shape, below its own title.
    if let Some((title_row, _)) = find_cell(grid, CAMPAIGNS_TITLE) {
        if let Some((desc_header, desc_label_col, desc_weeks)) =
            find_week_header(grid, title_row + 1, title_row + 1 + HEADER_LOOKAHEAD_ROWS)
        {
            for (marketplace, row) in marketplace_rows(grid, desc_header, desc_label_col) {
                let entries: BTreeMap<String, String> = desc_weeks
                    .iter()
                    .filter_map(|(col, key)| {
                        grid.trimmed(row, *col)
                            .map(|text| (key.clone(), text.to_string()))
                    })
                    .collect();
                if !entries.is_empty() {
                    promo.descriptions.insert(marketplace, entries);
                }
            }
        }
    }

    debug!(marketplaces = promo.scores.len(), "promo scores parsed");
    Some(promo)
}

/// Find the first "MP" header in rows `from_row..to_row`, returning its
/// row, label column, and the (column, canonical label) week axis.
fn find_week_header(
    grid: &Grid,
    from_row: usize,
    to_row: usize,
) -> Option<(usize, usize, Vec<(usize, String)>)> {
    for row in from_row..to_row.min(grid.rows()) {
        for col in 0..grid.cols() {
            if grid.trimmed(row, col) != Some(MP_HEADER) {
                continue;
            }
            let weeks: Vec<(usize, String)> = ((col + 1)..grid.cols())
                .map_while(|week_col| {
                    let text = grid.trimmed(row, week_col)?;
                    canonical_label(text).map(|key| (week_col, key))
                })
                .collect();
            if !weeks.is_empty() {
                return Some((row, col, weeks));
            }
        }
    }
    None
}

/// Marketplace rows below a header, bounded lookahead, blanks skipped.
fn marketplace_rows(
    grid: &Grid,
    header_row: usize,
    label_col: usize,
) -> Vec<(Marketplace, usize)> {
    let last = (header_row + ROW_LOOKAHEAD).min(grid.rows().saturating_sub(1));
    ((header_row + 1)..=last)
        .filter_map(|row| {
            let label = grid.trimmed(row, label_col)?;
            Marketplace::from_code(label).map(|mp| (mp, row))
        })
        .collect()
}

/// First cell whose trimmed text equals `needle`.
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
