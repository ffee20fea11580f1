//! In-memory (single node) stand-in for a JetStream broker, with failure
//! injection, for testing provisioning without a server.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use harbor_jetstream::{Connection, Connector, ConsumerConfig, Endpoint, StreamConfig};
use tokio::sync::Mutex;

/// A call received by the broker, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// A connection was opened (or refused).
    Connect(Endpoint),

    /// Stream creation was attempted.
    CreateStream(String),

    /// Consumer creation was attempted.
    CreateConsumer {
        /// Stream name.
        stream: String,

        /// Durable name.
        durable: String,
    },

    /// A connection was closed.
    Close,
}

#[derive(Debug, Default)]
struct Broker {
    fail_connect: bool,
    failing_consumers: HashSet<(String, String)>,
    failing_streams: HashSet<String>,
    operations: Vec<Operation>,
    streams: BTreeMap<String, Stream>,
}

#[derive(Debug)]
struct Stream {
    config: StreamConfig,
    consumers: BTreeMap<String, ConsumerConfig>,
}

/// Connector to a shared in-memory broker.
///
/// Clones share the same broker state.
#[derive(Clone, Debug, Default)]
pub struct MemoryConnector {
    broker: Arc<Mutex<Broker>>,
}

impl MemoryConnector {
    /// Creates a connector to an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses every connection attempt.
    pub async fn fail_connect(&self) {
        self.broker.lock().await.fail_connect = true;
    }

    /// Fails creation of the named stream.
    pub async fn fail_stream(&self, stream: impl Into<String>) {
        self.broker.lock().await.failing_streams.insert(stream.into());
    }

    /// Fails creation of the named consumer on the named stream.
    pub async fn fail_consumer(&self, stream: impl Into<String>, durable: impl Into<String>) {
        self.broker
            .lock()
            .await
            .failing_consumers
            .insert((stream.into(), durable.into()));
    }

    /// Every call received so far.
    pub async fn operations(&self) -> Vec<Operation> {
        self.broker.lock().await.operations.clone()
    }

    /// Names of existing streams, sorted.
    pub async fn streams(&self) -> Vec<String> {
        self.broker.lock().await.streams.keys().cloned().collect()
    }

    /// Configuration of an existing stream.
    pub async fn stream(&self, name: &str) -> Option<StreamConfig> {
        self.broker
            .lock()
            .await
            .streams
            .get(name)
            .map(|stream| stream.config.clone())
    }

    /// Durable names of the consumers on a stream, sorted. Empty if the stream is missing.
    pub async fn consumers(&self, stream: &str) -> Vec<String> {
        self.broker
            .lock()
            .await
            .streams
            .get(stream)
            .map(|stream| stream.consumers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Configuration of an existing consumer.
    pub async fn consumer(&self, stream: &str, durable: &str) -> Option<ConsumerConfig> {
        self.broker
            .lock()
            .await
            .streams
            .get(stream)
            .and_then(|stream| stream.consumers.get(durable).cloned())
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryConnection;
    type Error = Error;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MemoryConnection, Error> {
        let mut broker = self.broker.lock().await;
        broker.operations.push(Operation::Connect(endpoint.clone()));

        if broker.fail_connect {
            return Err(Error::ConnectionRefused(endpoint.to_string()));
        }

        Ok(MemoryConnection {
            broker: self.broker.clone(),
        })
    }
}

/// An open connection to the in-memory broker.
#[derive(Debug)]
pub struct MemoryConnection {
    broker: Arc<Mutex<Broker>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    type Error = Error;

    async fn create_stream(&self, config: &StreamConfig) -> Result<(), Error> {
        let mut broker = self.broker.lock().await;
        broker
            .operations
            .push(Operation::CreateStream(config.name.clone()));

        if broker.failing_streams.contains(&config.name) {
            return Err(Error::Injected(format!("stream {}", config.name)));
        }

        if broker.streams.contains_key(&config.name) {
            return Err(Error::StreamExists(config.name.clone()));
        }

        broker.streams.insert(
            config.name.clone(),
            Stream {
                config: config.clone(),
                consumers: BTreeMap::new(),
            },
        );

        Ok(())
    }

    async fn create_consumer(&self, stream: &str, config: &ConsumerConfig) -> Result<(), Error> {
        let mut broker = self.broker.lock().await;
        broker.operations.push(Operation::CreateConsumer {
            stream: stream.to_string(),
            durable: config.durable.clone(),
        });

        if broker
            .failing_consumers
            .contains(&(stream.to_string(), config.durable.clone()))
        {
            return Err(Error::Injected(format!(
                "consumer {} on stream {}",
                config.durable, stream
            )));
        }

        let Some(existing) = broker.streams.get_mut(stream) else {
            return Err(Error::StreamNotFound(stream.to_string()));
        };

        if existing.consumers.contains_key(&config.durable) {
            return Err(Error::ConsumerExists {
                stream: stream.to_string(),
                durable: config.durable.clone(),
            });
        }

        existing
            .consumers
            .insert(config.durable.clone(), config.clone());

        Ok(())
    }

    async fn close(self) {
        self.broker.lock().await.operations.push(Operation::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use assert_matches::assert_matches;
    use harbor_jetstream::{AckPolicy, DeliverPolicy, StorageType};

    fn stream(name: &str) -> StreamConfig {
        StreamConfig {
            name: name.to_string(),
            subjects: vec![format!("{}.*", name.to_lowercase())],
            storage: StorageType::Memory,
            replicas: 1,
        }
    }

    fn consumer(durable: &str) -> ConsumerConfig {
        ConsumerConfig {
            durable: durable.to_string(),
            ack_policy: AckPolicy::Explicit,
            max_deliver: 5,
            ack_wait: Duration::from_secs(30),
            deliver_policy: DeliverPolicy::All,
            max_ack_pending: 0,
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("localhost", 4222)
    }

    #[tokio::test]
    async fn test_creates_streams_and_consumers() {
        let connector = MemoryConnector::new();
        let connection = connector.connect(&endpoint()).await.unwrap();

        connection.create_stream(&stream("ORDERS")).await.unwrap();
        connection
            .create_consumer("ORDERS", &consumer("billing"))
            .await
            .unwrap();
        connection.close().await;

        assert_eq!(connector.streams().await, vec!["ORDERS".to_string()]);
        assert_eq!(
            connector.consumers("ORDERS").await,
            vec!["billing".to_string()]
        );
        assert_eq!(
            connector.operations().await,
            vec![
                Operation::Connect(endpoint()),
                Operation::CreateStream("ORDERS".to_string()),
                Operation::CreateConsumer {
                    stream: "ORDERS".to_string(),
                    durable: "billing".to_string(),
                },
                Operation::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_rejects_duplicates_and_missing_streams() {
        let connector = MemoryConnector::new();
        let connection = connector.connect(&endpoint()).await.unwrap();

        connection.create_stream(&stream("ORDERS")).await.unwrap();
        assert_matches!(
            connection.create_stream(&stream("ORDERS")).await,
            Err(Error::StreamExists(name)) if name == "ORDERS"
        );

        assert_matches!(
            connection.create_consumer("MISSING", &consumer("c1")).await,
            Err(Error::StreamNotFound(_))
        );

        connection
            .create_consumer("ORDERS", &consumer("c1"))
            .await
            .unwrap();
        assert_matches!(
            connection.create_consumer("ORDERS", &consumer("c1")).await,
            Err(Error::ConsumerExists { .. })
        );
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let connector = MemoryConnector::new();
        connector.fail_stream("B").await;
        connector.fail_consumer("A", "c2").await;

        let connection = connector.connect(&endpoint()).await.unwrap();
        connection.create_stream(&stream("A")).await.unwrap();
        assert_matches!(
            connection.create_stream(&stream("B")).await,
            Err(Error::Injected(_))
        );
        assert_matches!(
            connection.create_consumer("A", &consumer("c2")).await,
            Err(Error::Injected(_))
        );

        assert_eq!(connector.streams().await, vec!["A".to_string()]);
        assert!(connector.consumers("A").await.is_empty());

        connector.fail_connect().await;
        assert_matches!(
            connector.connect(&endpoint()).await,
            Err(Error::ConnectionRefused(_))
        );
    }
}
