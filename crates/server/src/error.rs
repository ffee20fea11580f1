use std::time::Duration;

use thiserror::Error;

/// A boxed error from one of the injected collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Where provisioning stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisioningStage {
    /// Creating the stream itself.
    Stream,

    /// Attaching one of the stream's consumers.
    Consumer {
        /// The consumer that could not be created.
        durable: String,
    },
}

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// `start` was called while an engine is held.
    #[error("server already started")]
    AlreadyStarted,

    /// Configuration failed structural validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Could not connect to the engine to provision streams.
    #[error("error connecting to server: {0}")]
    Connection(#[source] BoxError),

    /// A stream or one of its consumers could not be created.
    #[error("{}: {source}", provisioning_context(.stream, .stage))]
    Provisioning {
        /// The stream being provisioned.
        stream: String,

        /// What was being created.
        stage: ProvisioningStage,

        /// The cause.
        #[source]
        source: BoxError,
    },

    /// The engine did not accept connections in time.
    #[error("server not ready for connections")]
    ReadinessTimeout(Duration),

    /// The engine could not be created or launched.
    #[error("error starting server: {0}")]
    Start(#[source] BoxError),
}

fn provisioning_context(stream: &str, stage: &ProvisioningStage) -> String {
    match stage {
        ProvisioningStage::Stream => format!("error creating stream {stream}"),
        ProvisioningStage::Consumer { durable } => {
            format!("error creating consumer {durable} for stream {stream}")
        }
    }
}
