pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{AdjustmentType, ForecastMethod, InterventionKind, Priority};
pub use error::CoreError;
pub use structs::{
    BlendPoint, BlendResult, CorrelationEdge, CorrelationReport, ForecastPoint, Intervention,
    MetricProjection, ModelForecast, Observation, SimulationReport, TimeSeriesPoint,
};
