use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown task kind '{0}' (expected causal_recompute, forecast_blend or simulation_projection)")]
    UnknownKind(String),

    #[error("Payload does not match task kind '{kind}': {source}")]
    PayloadMismatch {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize task message: {0}")]
    Serialization(#[from] serde_json::Error),
}
