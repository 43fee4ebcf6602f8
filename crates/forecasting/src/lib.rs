//! # Vantage Forecasting
//!
//! Single-series forecasting and multi-model blending.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** This crate has no knowledge of tasks, workers or configuration
//!   files. It depends only on `core-types`.
//! - **Graceful degradation:** Too little history, an empty model list or all-zero
//!   weights produce empty results, never errors. Errors are reserved for inputs that
//!   are malformed (non-finite values, out-of-range smoothing constants, negative weights).
//!
//! ## Public API
//!
//! - `ForecastEngine`: simple exponential smoothing and additive Holt-Winters.
//! - `ForecastBlender`: weighted combination of several model forecasts.
//! - `ForecastReport`: forecast points plus fit diagnostics.
//! - `ForecastError`: the error type for this crate.

// Declare the modules that constitute this crate.
pub mod blender;
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use blender::ForecastBlender;
pub use engine::{ForecastEngine, ForecastOptions, MIN_SERIES_LEN};
pub use error::ForecastError;
pub use report::ForecastReport;
