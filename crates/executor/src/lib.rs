//! # Executor Crate
//!
//! The execution side of a run: discovery, the optional tunnel, one database
//! session, and the ordered execution of every script through it.
//!
//! ## Architectural Principles
//!
//! - **One Session, Strictly Sequential:** every script of a batch runs over the
//!   same connection, one after another. The session is acquired once and
//!   closed exactly once, on the success path and on every error path.
//! - **Session Abstraction:** `ScriptDriver` only talks to the
//!   `database::ScriptSession` trait, so the ordering, reporting and failure
//!   policy can be exercised without a live database.
//!
//! ## Public API
//!
//! - `run`: the full pipeline for one `Settings`.
//! - `ScriptDriver`: executes a `ScriptBatch` under a `FailurePolicy`.
//! - `RunReport`: the ordered `ExecutionOutcome`s of a run.
//! - `ExecutorError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod driver;
pub mod error;
pub mod report;

// Re-export the key components to provide a clean, public-facing API.
pub use driver::ScriptDriver;
pub use error::{ExecutorError, ScriptFailure};
pub use report::RunReport;

use configuration::Settings;
use core_types::ScriptBatch;
use database::{PgConnectOptions, PgSession, connect_options, through_tunnel};
use scripts::ScriptLocator;
use tunnel::SshTunnel;

/// Runs every script under `settings.sql_dir` against the configured database.
///
/// Configuration, discovery, tunnel and connection errors are returned before
/// any script runs. Script errors are reported according to the failure policy.
pub async fn run(settings: &Settings) -> Result<RunReport, ExecutorError> {
    settings.validate()?;

    let batch = ScriptLocator::new(&settings.extensions)
        .locate(&settings.sql_dir)
        .map_err(ExecutorError::Discovery)?;
    tracing::info!(
        dir = %settings.sql_dir.display(),
        count = batch.len(),
        policy = %settings.failure_policy,
        "Scripts discovered"
    );

    let tunnel = match settings.tunnel()? {
        Some(tunnel_settings) => Some(SshTunnel::open(&tunnel_settings).await?),
        None => None,
    };

    let local_port = tunnel.as_ref().map(SshTunnel::local_port);
    let result = connect_and_execute(settings, &batch, local_port).await;

    if let Some(tunnel) = tunnel
        && let Err(e) = tunnel.close().await
    {
        tracing::warn!(error = %e, "Failed to stop the SSH tunnel");
    }

    result
}

async fn connect_and_execute(
    settings: &Settings,
    batch: &ScriptBatch,
    tunnel_port: Option<u16>,
) -> Result<RunReport, ExecutorError> {
    let driver = ScriptDriver::from_settings(settings)?;
    let options = session_options(settings, tunnel_port)?;
    let session = PgSession::connect(&options).await?;

    driver.execute(session, batch).await
}

/// Connection options for the run; with a tunnel open, the connection goes to
/// its local end whatever host and port `database_url` names.
fn session_options(
    settings: &Settings,
    tunnel_port: Option<u16>,
) -> Result<PgConnectOptions, ExecutorError> {
    let options = connect_options(
        &settings.database_url,
        &settings.database_user,
        &settings.database_password,
        &settings.schema_name,
    )?;
    Ok(match tunnel_port {
        Some(port) => through_tunnel(options, port),
        None => options,
    })
}
