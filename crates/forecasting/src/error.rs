use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid smoothing parameter '{name}': {value} (must be in (0, 1])")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Invalid weight {weight} for model '{model_id}' (must be finite and >= 0)")]
    InvalidWeight { model_id: String, weight: f64 },

    #[error("Model id '{0}' appears more than once in the blend")]
    DuplicateModel(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] core_types::CoreError),
}
