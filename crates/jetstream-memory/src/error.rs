use thiserror::Error;

/// Errors returned by the in-memory broker.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The broker refused the connection.
    #[error("connection refused by {0}")]
    ConnectionRefused(String),

    /// A consumer with this durable name already exists on the stream.
    #[error("consumer {durable} already exists on stream {stream}")]
    ConsumerExists {
        /// Stream name.
        stream: String,

        /// Durable name.
        durable: String,
    },

    /// A scripted failure.
    #[error("injected failure: {0}")]
    Injected(String),

    /// A stream with this name already exists.
    #[error("stream {0} already exists")]
    StreamExists(String),

    /// The stream does not exist.
    #[error("stream {0} not found")]
    StreamNotFound(String),
}
