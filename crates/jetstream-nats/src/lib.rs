//! JetStream administration over `async-nats`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::fmt;
use std::time::Duration;

use async_nats::jetstream::Context;
use async_nats::jetstream::consumer::pull::Config as NatsConsumerConfig;
use async_nats::jetstream::consumer::{
    AckPolicy as NatsAckPolicy, DeliverPolicy as NatsDeliverPolicy,
};
use async_nats::jetstream::stream::{Config as NatsStreamConfig, StorageType as NatsStorageType};
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use harbor_jetstream::{
    AckPolicy, Connection, Connector, ConsumerConfig, DeliverPolicy, Endpoint, StorageType,
    StreamConfig,
};
use tracing::{debug, warn};

const DEFAULT_CONNECTION_NAME: &str = "harbor-provisioner";
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Credentials presented when connecting.
#[derive(Clone, PartialEq, Eq)]
pub enum ClientCredentials {
    /// Username and password.
    UserPassword {
        /// The username.
        username: String,

        /// The password.
        password: String,
    },

    /// Shared token.
    Token(String),

    /// Private nkey seed (starts with `SU`).
    NkeySeed(String),
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPassword { username, .. } => f
                .debug_struct("UserPassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Self::NkeySeed(_) => f.debug_tuple("NkeySeed").field(&"<redacted>").finish(),
        }
    }
}

/// Options for configuring a `NatsConnector`.
#[derive(Clone, Debug)]
pub struct NatsConnectorOptions {
    /// Name the connection reports to the server.
    pub connection_name: String,

    /// How long to wait for the initial connection.
    pub connection_timeout: Duration,

    /// Credentials to present, if the server requires any.
    pub credentials: Option<ClientCredentials>,
}

impl Default for NatsConnectorOptions {
    fn default() -> Self {
        Self {
            connection_name: DEFAULT_CONNECTION_NAME.to_string(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            credentials: None,
        }
    }
}

/// Opens JetStream connections with `async-nats`.
#[derive(Clone, Debug, Default)]
pub struct NatsConnector {
    options: NatsConnectorOptions,
}

impl NatsConnector {
    /// Creates a new `NatsConnector` with the specified options.
    #[must_use]
    pub const fn new(options: NatsConnectorOptions) -> Self {
        Self { options }
    }

    fn connect_options(&self) -> ConnectOptions {
        let options = match &self.options.credentials {
            Some(ClientCredentials::UserPassword { username, password }) => {
                ConnectOptions::with_user_and_password(username.clone(), password.clone())
            }
            Some(ClientCredentials::Token(token)) => ConnectOptions::with_token(token.clone()),
            Some(ClientCredentials::NkeySeed(seed)) => ConnectOptions::with_nkey(seed.clone()),
            None => ConnectOptions::new(),
        };

        options
            .name(&self.options.connection_name)
            .connection_timeout(self.options.connection_timeout)
    }
}

#[async_trait]
impl Connector for NatsConnector {
    type Connection = NatsConnection;
    type Error = Error;

    async fn connect(&self, endpoint: &Endpoint) -> Result<NatsConnection, Error> {
        let address = format!("nats://{endpoint}");

        let client = self
            .connect_options()
            .connect(&address)
            .await
            .map_err(|e| Error::Connect(address.clone(), e.kind()))?;

        debug!("connected to {} for provisioning", address);

        Ok(NatsConnection {
            jetstream_context: async_nats::jetstream::new(client.clone()),
            client,
        })
    }
}

/// An open `async-nats` client with its JetStream context.
#[derive(Clone, Debug)]
pub struct NatsConnection {
    client: Client,
    jetstream_context: Context,
}

#[async_trait]
impl Connection for NatsConnection {
    type Error = Error;

    async fn create_stream(&self, config: &StreamConfig) -> Result<(), Error> {
        self.jetstream_context
            .create_stream(nats_stream_config(config))
            .await
            .map_err(|e| Error::CreateStream(config.name.clone(), e.kind()))?;

        Ok(())
    }

    async fn create_consumer(&self, stream: &str, config: &ConsumerConfig) -> Result<(), Error> {
        self.jetstream_context
            .create_consumer_on_stream(nats_consumer_config(config), stream)
            .await
            .map_err(|e| Error::CreateConsumer(config.durable.clone(), e.kind()))?;

        Ok(())
    }

    async fn close(self) {
        if let Err(e) = self.client.flush().await {
            warn!("failed to flush provisioning connection: {}", e);
        }
    }
}

fn nats_stream_config(config: &StreamConfig) -> NatsStreamConfig {
    NatsStreamConfig {
        name: config.name.clone(),
        subjects: config.subjects.clone(),
        storage: match config.storage {
            StorageType::File => NatsStorageType::File,
            StorageType::Memory => NatsStorageType::Memory,
        },
        num_replicas: config.replicas,
        ..Default::default()
    }
}

fn nats_consumer_config(config: &ConsumerConfig) -> NatsConsumerConfig {
    NatsConsumerConfig {
        durable_name: Some(config.durable.clone()),
        ack_policy: match config.ack_policy {
            AckPolicy::Explicit => NatsAckPolicy::Explicit,
            AckPolicy::None => NatsAckPolicy::None,
            AckPolicy::All => NatsAckPolicy::All,
        },
        ack_wait: config.ack_wait,
        max_deliver: config.max_deliver,
        deliver_policy: match config.deliver_policy {
            DeliverPolicy::All => NatsDeliverPolicy::All,
            DeliverPolicy::New => NatsDeliverPolicy::New,
            DeliverPolicy::Last => NatsDeliverPolicy::Last,
            DeliverPolicy::LastPerSubject => NatsDeliverPolicy::LastPerSubject,
            DeliverPolicy::ByStartSequence(start_sequence) => {
                NatsDeliverPolicy::ByStartSequence { start_sequence }
            }
        },
        max_ack_pending: config.max_ack_pending,
        ..Default::default()
    }
}
