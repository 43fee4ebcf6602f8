//! # Vantage Experiments
//!
//! A long-lived multi-armed-bandit registry. Unlike the forecasting, correlation
//! and simulation engines it is not dispatched as a task: it keeps state across
//! many short calls and is shared directly between call sites.
//!
//! ## Public API
//!
//! - `BanditRegistry`: register arms, record rewards, rank and select arms.
//! - `BanditArm`, `ArmMetadata`, `ArmStats`: the stored state of one arm.
//! - `ArmSummary`, `ArmStatus`: derived, on-demand views (rank, status, confidence).

pub mod arm;
pub mod error;
pub mod registry;

pub use arm::{ArmMetadata, ArmStats, ArmStatus, ArmSummary, BanditArm};
pub use error::ExperimentError;
pub use registry::BanditRegistry;
