//! # Haul Data
//!
//! Data layer for the EU5 weekly metric forecasting stack.
//!
//! ## Features
//!
//! - Week-label codec ("Wk19 2025" ↔ calendar dates) with Sunday-start
//!   business-week rendering
//! - Untyped cell grid model with a CSV-backed workbook loader
//! - Heuristic spreadsheet table locator for metric sections
//! - Time series stores for actuals and manual forecasts, with EU5
//!   aggregation and driver-product reconciliation
//! - Promotional intensity scores with display bands
//!
//! ## Quick Start
//!
//! ```no_run
//! use haul_data::grid::Workbook;
//! use haul_data::keys::{Marketplace, Metric};
//! use haul_data::store::Dataset;
//!
//! let workbook = Workbook::from_csv_paths(&["inputs_forecasting.csv"])?;
//! let (dataset, diagnostics) = Dataset::from_workbook(&workbook)?;
//!
//! let table = dataset
//!     .actuals()
//!     .clean_table(Metric::Transits, Marketplace::Uk);
//! println!("{} clean weeks parsed", table.len());
//! # Ok::<(), haul_data::DataError>(())
//! ```

pub mod error;
pub mod grid;
pub mod keys;
pub mod locator;
pub mod promo;
pub mod store;
pub mod week;

// Re-export commonly used types
pub use crate::error::DataError;
pub use crate::grid::{Cell, Grid, Workbook};
pub use crate::keys::{Marketplace, Metric};
pub use crate::promo::PromoScores;
pub use crate::store::{Dataset, MetricStore, ObservedPoint};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
