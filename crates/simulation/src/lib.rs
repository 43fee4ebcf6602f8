//! # Vantage Simulation
//!
//! Deterministic "what if" projections: baseline metrics are pushed through an
//! ordered list of interventions using a generator seeded from a caller-supplied
//! string, so a scenario can be replayed exactly.

pub mod engine;
pub mod error;
pub mod rng;

pub use engine::SimulationEngine;
pub use error::SimulationError;
pub use rng::SeededRng;
