use thiserror::Error;

#[derive(Error, Debug)]
pub enum CausalError {
    #[error("Invalid observation: {0}")]
    InvalidObservation(#[from] core_types::CoreError),

    #[error("Invalid edge threshold {0} (must be in [0, 1))")]
    InvalidThreshold(f64),
}
