//! # SSH Tunnel
//!
//! Opens the optional local port forward a run needs before it can reach the
//! database. The forward is provided by the system `ssh` client (under
//! `sshpass` when a password is configured); this crate only starts it, waits
//! for the local port to accept connections, and stops it afterwards.

use configuration::TunnelSettings;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};

pub mod error;

pub use error::TunnelError;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);
const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// A running port forward. The ssh process is killed on `close` or on drop.
pub struct SshTunnel {
    child: Child,
    local_port: u16,
}

impl SshTunnel {
    /// Starts the forward and returns once `127.0.0.1:<local_port>` accepts connections.
    ///
    /// The local port must be free beforehand, otherwise whatever already
    /// listens there would pass for the tunnel.
    pub async fn open(settings: &TunnelSettings) -> Result<Self, TunnelError> {
        ensure_port_free(settings.local_port).await?;

        let (mut cmd, program) = tunnel_command(settings);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|source| TunnelError::Spawn { program, source })?;
        wait_until_ready(&mut child, settings.local_port, READY_TIMEOUT).await?;

        tracing::info!(
            "SSH tunnel open: 127.0.0.1:{} -> {}:{} via {}@{}:{}",
            settings.local_port,
            settings.remote_host,
            settings.remote_port,
            settings.user,
            settings.host,
            settings.port
        );
        Ok(Self {
            child,
            local_port: settings.local_port,
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub async fn close(mut self) -> Result<(), TunnelError> {
        self.child.kill().await.map_err(TunnelError::Stop)?;
        tracing::debug!(local_port = self.local_port, "SSH tunnel closed");
        Ok(())
    }
}

/// Arguments for `ssh` itself; the password, when present, travels in `SSHPASS`.
fn ssh_args(settings: &TunnelSettings) -> Vec<String> {
    let mut args = vec![
        "-N".to_string(),
        "-o".to_string(),
        "ExitOnForwardFailure=yes".to_string(),
    ];
    if settings.password.is_none() {
        args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
    }
    args.extend([
        "-p".to_string(),
        settings.port.to_string(),
        "-L".to_string(),
        format!(
            "127.0.0.1:{}:{}:{}",
            settings.local_port, settings.remote_host, settings.remote_port
        ),
        format!("{}@{}", settings.user, settings.host),
    ]);
    args
}

fn tunnel_command(settings: &TunnelSettings) -> (Command, &'static str) {
    match &settings.password {
        Some(password) => {
            let mut cmd = Command::new("sshpass");
            cmd.arg("-e").arg("ssh").args(ssh_args(settings)).env("SSHPASS", password);
            (cmd, "sshpass")
        }
        None => {
            let mut cmd = Command::new("ssh");
            cmd.args(ssh_args(settings));
            (cmd, "ssh")
        }
    }
}

async fn ensure_port_free(port: u16) -> Result<(), TunnelError> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|source| TunnelError::PortInUse { port, source })?;
    drop(listener);
    Ok(())
}

async fn wait_until_ready(
    child: &mut Child,
    port: u16,
    timeout: Duration,
) -> Result<(), TunnelError> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(TunnelError::Wait)? {
            return Err(TunnelError::Exited(status));
        }
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            // ssh exits on a failed forward; the accepting socket must be its own.
            if let Some(status) = child.try_wait().map_err(TunnelError::Wait)? {
                return Err(TunnelError::Exited(status));
            }
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(TunnelError::NotReady {
                port,
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}
