use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Required configuration key '{0}' is missing or empty")]
    MissingKey(&'static str),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}
