use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Baseline for metric '{0}' is not a finite number")]
    InvalidBaseline(String),

    #[error("Intervention #{index} has a non-finite adjustment")]
    InvalidAdjustment { index: usize },
}
