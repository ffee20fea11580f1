use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine was already launched.
    #[error("nats server already started")]
    AlreadyStarted,

    /// The `nats-server` binary could not be located.
    #[error("nats-server binary not found")]
    BinaryNotFound,

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// Something else is already listening on the client address.
    #[error("cannot listen on {host}:{port}: {source}")]
    PortInUse {
        /// The configured host.
        host: String,

        /// The configured port.
        port: u16,

        /// Why binding failed.
        #[source]
        source: std::io::Error,
    },

    /// Spawning the server process failed.
    #[error("failed to spawn nats server: {0}")]
    Spawn(#[source] std::io::Error),
}
