//! # Haul Workspace
//!
//! Umbrella crate for the EU5 weekly metric forecasting stack: re-exports
//! the data layer (`haul_data`) and the forecasting layer (`haul_forecast`).

pub use haul_data;
pub use haul_forecast;
