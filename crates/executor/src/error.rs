use std::path::PathBuf;
use thiserror::Error;

/// Why a single script did not run.
#[derive(Error, Debug)]
pub enum ScriptFailure {
    #[error(transparent)]
    Load(#[from] scripts::ScriptsError),

    #[error(transparent)]
    Database(#[from] database::DbError),
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::error::ConfigError),

    #[error("Script discovery failed: {0}")]
    Discovery(#[source] scripts::ScriptsError),

    #[error("Tunnel error: {0}")]
    Tunnel(#[from] tunnel::TunnelError),

    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("Error on script #{index} {}: {source}", .path.display())]
    Script {
        index: usize,
        path: PathBuf,
        #[source]
        source: ScriptFailure,
    },
}
