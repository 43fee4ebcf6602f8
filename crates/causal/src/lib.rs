//! # Vantage Causal Correlation
//!
//! Builds a correlation graph between metrics from a flat list of observations.
//! Every unordered pair of metrics is scored with a Pearson coefficient; pairs whose
//! absolute coefficient exceeds the edge threshold are counted as graph edges.

pub mod engine;
pub mod error;

pub use engine::{CorrelationEngine, DEFAULT_EDGE_THRESHOLD, pearson};
pub use error::CausalError;
