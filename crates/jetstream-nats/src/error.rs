use thiserror::Error;

/// Errors that can occur while administering JetStream.
#[derive(Debug, Error)]
pub enum Error {
    /// Could not connect to the server.
    #[error("failed to connect to {0}: {1}")]
    Connect(String, async_nats::ConnectErrorKind),

    /// The server rejected a consumer.
    #[error("failed to create consumer {0}: {1}")]
    CreateConsumer(String, async_nats::jetstream::stream::ConsumerErrorKind),

    /// The server rejected a stream.
    #[error("failed to create stream {0}: {1}")]
    CreateStream(String, async_nats::jetstream::context::CreateStreamErrorKind),
}
