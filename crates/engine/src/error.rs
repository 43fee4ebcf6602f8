use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Forecast error: {0}")]
    Forecast(#[from] forecasting::ForecastError),

    #[error("Correlation error: {0}")]
    Causal(#[from] causal::CausalError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] simulation::SimulationError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] events::ProtocolError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::error::ConfigError),

    #[error("Task input too large: {what} = {actual} exceeds the limit of {limit}")]
    LimitExceeded {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    #[error("The task runner has shut down and no longer accepts commands.")]
    RunnerClosed,

    #[error("The task runner stopped unexpectedly: {0}")]
    Join(#[from] tokio::task::JoinError),
}
