//! # Haul Forecast
//!
//! Forecasting layer for the EU5 weekly metric stack.
//!
//! ## Features
//!
//! - Seasonal ARIMA-style model with an optional promotional exogenous
//!   regressor and 85% confidence intervals
//! - Decomposition-based alternate model (trend changepoints + period-4
//!   seasonality)
//! - Deterministic moving-average fallback on numerical fit failure
//! - Business-rule post-processing: metric caps, promo-floor blending, and
//!   Net Ordered Units composed as the product of its three drivers
//! - Accuracy scoring of the manual forecast against actuals
//! - Parallel batch fitting across metrics and marketplaces
//!
//! ## Quick Start
//!
//! ```no_run
//! use haul_data::grid::Workbook;
//! use haul_data::store::Dataset;
//! use haul_forecast::batch::{forecast_all, BatchOptions};
//!
//! let workbook = Workbook::from_csv_paths(&["inputs_forecasting.csv"])?;
//! let (dataset, _diagnostics) = Dataset::from_workbook(&workbook)?;
//!
//! let batch = forecast_all(&dataset, &BatchOptions::default());
//! for (metric, per_marketplace) in batch.payloads() {
//!     println!("{metric}: {} forecasts", per_marketplace.len());
//! }
//! # Ok::<(), haul_data::DataError>(())
//! ```

pub mod accuracy;
pub mod batch;
pub mod engine;
pub mod error;
pub mod models;
pub mod rules;

// Re-export commonly used types
pub use crate::accuracy::{AccuracyRecord, Timeframe};
pub use crate::batch::{forecast_all, BatchForecasts, BatchOptions};
pub use crate::engine::{FitOptions, Forecaster, ModelKind, FORECAST_HORIZON};
pub use crate::error::ForecastError;
pub use crate::models::{Forecast, ForecastResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
