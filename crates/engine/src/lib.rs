//! # Vantage Engine
//!
//! The background execution context. A [`TaskRunner`] owns a priority queue of
//! submitted tasks and a bounded pool of blocking workers; each task is handed to
//! a [`TaskExecutor`], and its outcome (success, error, or caught panic) comes
//! back on the result stream tagged with the task id and its processing time.
//!
//! [`AnalyticsExecutor`] is the production executor, dispatching every task kind
//! to the forecasting, correlation and simulation engines.

pub mod error;
pub mod executor;
pub mod runner;

pub use error::EngineError;
pub use executor::{AnalyticsExecutor, TaskExecutor};
pub use runner::TaskRunner;
