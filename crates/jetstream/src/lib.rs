//! Client boundary used to administer persistent streams on a running broker.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;

pub use config::{AckPolicy, ConsumerConfig, DeliverPolicy, StorageType, StreamConfig};

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;

/// Address of a broker's client listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address.
    pub host: String,

    /// Client port.
    pub port: u16,
}

impl Endpoint {
    /// Creates a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens administrative connections to a broker.
#[async_trait]
pub trait Connector
where
    Self: Send + Sync + 'static,
{
    /// The connection type produced.
    type Connection: Connection;

    /// Error returned when no connection can be established.
    type Error: StdError + Send + Sync + 'static;

    /// Connects to the broker at `endpoint`.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Connection, Self::Error>;
}

/// An open connection able to create streams and consumers.
#[async_trait]
pub trait Connection
where
    Self: Send + Sync + 'static,
{
    /// Error returned by creation calls.
    type Error: StdError + Send + Sync + 'static;

    /// Creates a persistent stream.
    async fn create_stream(&self, config: &StreamConfig) -> Result<(), Self::Error>;

    /// Creates a durable consumer on an existing stream.
    async fn create_consumer(
        &self,
        stream: &str,
        config: &ConsumerConfig,
    ) -> Result<(), Self::Error>;

    /// Closes the connection. Failures are not reported.
    async fn close(self);
}
