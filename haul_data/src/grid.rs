//! Untyped cell grids and the workbook loader
//!
//! A sheet arrives as a positional grid of loosely typed cells with no
//! header assumptions; everything downstream of the loader scans it
//! heuristically. Corrupted export placeholders ("[object Object]", "nan")
//! coerce to missing, never to zero.

use crate::error::Result;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Sheet name preferred for actuals data.
pub const ACTUALS_SHEET: &str = "Actuals";
/// Fallback sheet name for actuals data.
pub const DEFAULT_SHEET: &str = "Sheet1";
/// Sheet name holding the manual forecast.
pub const FORECAST_SHEET: &str = "Forecast";
/// Sheet name holding promotional intensity scores.
pub const PROMO_SHEET: &str = "Promo Scores";

/// One untyped sheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Build a cell from a raw field: numeric where it parses, text
    /// otherwise, empty for blanks.
    pub fn from_field(field: &str) -> Cell {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Number(value),
            // "nan" parses as a float but carries no information.
            Ok(_) => Cell::Empty,
            Err(_) => Cell::Text(field.to_string()),
        }
    }

    /// Trimmed text content, `None` for empty or non-text cells.
    pub fn trimmed(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    /// Numeric value of the cell, treating corrupted placeholders and
    /// unparseable text as missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) if value.is_finite() => Some(*value),
            Cell::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty()
                    || trimmed == "[object Object]"
                    || trimmed.eq_ignore_ascii_case("nan")
                {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    /// True for blank cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

/// A positional 2-D grid of cells, possibly ragged.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    cols: usize,
}

impl Grid {
    /// Create a grid from rows of cells.
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { rows, cols }
    }

    /// Load a grid from a delimited file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Grid> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Load a grid from any delimited reader, headerless and ragged-tolerant.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Grid> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::from_field).collect());
        }

        let grid = Grid::new(rows);
        debug!(rows = grid.rows(), cols = grid.cols(), "sheet loaded");
        Ok(grid)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the widest row.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell at (row, col); out-of-bounds coordinates read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Trimmed text at (row, col), `None` for empty/non-text cells.
    pub fn trimmed(&self, row: usize, col: usize) -> Option<&str> {
        self.cell(row, col).trimmed()
    }
}

/// An ordered collection of named sheets.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, Grid)>,
}

impl Workbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named sheet.
    pub fn insert(&mut self, name: impl Into<String>, grid: Grid) {
        self.sheets.push((name.into(), grid));
    }

    /// Assemble a workbook from delimited files, one per sheet, using each
    /// file's stem as the sheet name.
    pub fn from_csv_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            workbook.insert(name, Grid::from_csv_path(path)?);
        }
        Ok(workbook)
    }

    /// Look up a sheet by exact name.
    pub fn sheet(&self, name: &str) -> Option<&Grid> {
        self.sheets
            .iter()
            .find(|(sheet_name, _)| sheet_name == name)
            .map(|(_, grid)| grid)
    }

    /// The actuals sheet: "Actuals", else "Sheet1", else the first sheet.
    pub fn actuals_sheet(&self) -> Option<&Grid> {
        self.sheet(ACTUALS_SHEET)
            .or_else(|| self.sheet(DEFAULT_SHEET))
            .or_else(|| self.sheets.first().map(|(_, grid)| grid))
    }

    /// The optional manual-forecast sheet.
    pub fn forecast_sheet(&self) -> Option<&Grid> {
        self.sheet(FORECAST_SHEET)
    }

    /// The optional promo-scores sheet.
    pub fn promo_sheet(&self) -> Option<&Grid> {
        self.sheet(PROMO_SHEET)
    }

    /// Sheet names in insertion order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }
}
