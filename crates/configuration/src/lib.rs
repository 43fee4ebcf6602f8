use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    BanditSettings, CorrelationSettings, ForecastSettings, LogFormat, LoggingSettings, Settings,
    SimulationSettings, WorkerSettings,
};

/// The file consulted by `load_config` when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "vantage.toml";

/// Prefix for environment overrides, e.g. `VANTAGE_WORKER__WORKERS=4`.
pub const ENV_PREFIX: &str = "VANTAGE";

/// Loads the application configuration from `vantage.toml` (if present) and the
/// environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Loads configuration from an explicit file path layered under environment
/// overrides. A missing file is not an error; every field has a default.
pub fn load_config_from(path: &Path) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(environment())
        .build()?;

    finish(builder)
}

/// Parses configuration from an in-memory TOML document, still honouring
/// environment overrides.
pub fn load_config_from_str(toml: &str) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .add_source(environment())
        .build()?;

    finish(builder)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: config::Config) -> Result<Settings, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Settings` struct
    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults_for_missing_sections() {
        let settings = load_config_from_str(
            r#"
            [forecast]
            alpha = 0.5

            [correlation]
            edge_threshold = 0.45
            "#,
        )
        .unwrap();
        assert_eq!(settings.forecast.alpha, 0.5);
        assert_eq!(settings.forecast.beta, 0.1);
        assert_eq!(settings.correlation.edge_threshold, 0.45);
        assert_eq!(settings.simulation.max_interventions, 1_000);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = load_config_from_str("[forecast]\nalpha = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.forecast.max_horizon, 365);
    }

    #[test]
    fn reads_settings_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[worker]\nworkers = 2\nresult_buffer = 4").unwrap();
        let settings = load_config_from(file.path()).unwrap();
        assert_eq!(settings.worker.effective_workers(), 2);
        assert_eq!(settings.worker.result_buffer, 4);
    }
}
