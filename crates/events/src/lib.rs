//! # Vantage Events
//!
//! This crate defines the task protocol: the envelope a caller submits, the
//! strongly-typed payload for each task kind, the result that comes back, and the
//! `PendingRequest` token callers use to discard stale results.
//!
//! As a Layer 0 crate, it depends only on `core-types`.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;
pub mod pending;

// Re-export the core types to provide a clean public API.
pub use error::ProtocolError;
pub use messages::{
    CausalRecomputePayload, ForecastBlendPayload, ModelSpec, SimulationProjectionPayload, Task,
    TaskEnvelope, TaskId, TaskKind, TaskOutput, TaskPayload, TaskResult,
};
pub use pending::{ActiveRequest, PendingRequest};
