use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("Failed to start '{program}' for the SSH tunnel: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Local tunnel port {port} is already in use: {source}")]
    PortInUse {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to check on the SSH tunnel process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("SSH tunnel exited before it was ready ({0})")]
    Exited(std::process::ExitStatus),

    #[error("SSH tunnel did not open local port {port} within {waited_ms} ms")]
    NotReady { port: u16, waited_ms: u64 },

    #[error("Failed to stop the SSH tunnel: {0}")]
    Stop(#[source] std::io::Error),
}
