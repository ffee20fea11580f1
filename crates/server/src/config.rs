use std::path::PathBuf;
use std::time::Duration;

use harbor_engine::{Authorization, EngineConfig};
use harbor_jetstream::{
    AckPolicy, ConsumerConfig, DeliverPolicy, Endpoint, StorageType, StreamConfig,
};

use crate::error::{Error, Result};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 4222;
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STORE_DIR: &str = "/var/lib/nats/jetstream";

const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_DELIVER: i64 = 5;

/// Configuration of the embedded server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Credentials clients must present. Handed to the engine as is.
    pub authorization: Option<Authorization>,

    /// Whether the engine produces debug output.
    pub debug: bool,

    /// The host to listen on.
    pub host: String,

    /// Whether JetStream is enabled. Streams are only provisioned when it is.
    pub jetstream: bool,

    /// Whether the engine's own logging is suppressed.
    pub no_log: bool,

    /// Whether the engine ignores signals sent to the host process.
    pub no_sigs: bool,

    /// The port to listen on.
    pub port: u16,

    /// How long `start` waits for the engine to accept connections.
    pub ready_timeout: Duration,

    /// Name the engine advertises.
    pub server_name: Option<String>,

    /// Directory for file-backed JetStream storage. `None` (or an empty path)
    /// keeps file storage in a temporary directory that is removed when the
    /// engine stops.
    pub store_dir: Option<PathBuf>,

    /// Whether the engine produces protocol traces.
    pub trace: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            authorization: None,
            debug: false,
            host: DEFAULT_HOST.to_string(),
            jetstream: true,
            no_log: false,
            no_sigs: true,
            port: DEFAULT_PORT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            server_name: None,
            store_dir: Some(PathBuf::from(DEFAULT_STORE_DIR)),
            trace: false,
        }
    }
}

impl ServerConfig {
    /// Starts from the defaults.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Checks the structural invariants.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the readiness timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.ready_timeout.is_zero() {
            return Err(Error::Config("readiness timeout must be positive".to_string()));
        }

        Ok(())
    }

    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub(crate) fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            authorization: self.authorization.clone(),
            debug: self.debug,
            host: self.host.clone(),
            jetstream: self.jetstream,
            no_log: self.no_log,
            no_sigs: self.no_sigs,
            port: self.port,
            server_name: self.server_name.clone(),
            store_dir: self
                .store_dir
                .clone()
                .filter(|dir| !dir.as_os_str().is_empty()),
            trace: self.trace,
        }
    }
}

/// Builds a [`ServerConfig`] from the defaults. Later calls win.
#[derive(Clone, Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Sets the credentials clients must present.
    #[must_use]
    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.config.authorization = Some(authorization);
        self
    }

    /// Enables or disables debug output.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Sets the listen host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Enables or disables JetStream.
    #[must_use]
    pub const fn with_jetstream(mut self, jetstream: bool) -> Self {
        self.config.jetstream = jetstream;
        self
    }

    /// Suppresses or allows the engine's own logging.
    #[must_use]
    pub const fn with_no_log(mut self, no_log: bool) -> Self {
        self.config.no_log = no_log;
        self
    }

    /// Controls whether the engine ignores host signals.
    #[must_use]
    pub const fn with_no_sigs(mut self, no_sigs: bool) -> Self {
        self.config.no_sigs = no_sigs;
        self
    }

    /// Sets the listen port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets how long `start` waits for readiness.
    #[must_use]
    pub const fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.config.ready_timeout = ready_timeout;
        self
    }

    /// Sets the advertised server name.
    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.config.server_name = Some(server_name.into());
        self
    }

    /// Stores JetStream data under `store_dir`.
    #[must_use]
    pub fn with_store_dir(mut self, store_dir: impl Into<PathBuf>) -> Self {
        self.config.store_dir = Some(store_dir.into());
        self
    }

    /// Keeps JetStream files in a temporary directory removed with the engine.
    #[must_use]
    pub fn with_ephemeral_storage(mut self) -> Self {
        self.config.store_dir = None;
        self
    }

    /// Enables or disables protocol traces.
    #[must_use]
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.config.trace = trace;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// A persistent stream to create at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    /// Stream name.
    pub name: String,

    /// Subject patterns the stream captures.
    pub subjects: Vec<String>,

    /// Storage backend.
    pub storage: StorageType,

    /// Replica count.
    pub replicas: usize,

    /// Consumers created after the stream, in order.
    pub consumers: Vec<ConsumerSpec>,
}

impl StreamSpec {
    /// A file-backed, single-replica stream with no subjects or consumers yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subjects: Vec::new(),
            storage: StorageType::File,
            replicas: 1,
            consumers: Vec::new(),
        }
    }

    /// Replaces the subject patterns.
    #[must_use]
    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub const fn with_storage(mut self, storage: StorageType) -> Self {
        self.storage = storage;
        self
    }

    /// Sets the replica count.
    #[must_use]
    pub const fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Appends a consumer.
    #[must_use]
    pub fn with_consumer(mut self, consumer: ConsumerSpec) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// Checks the structural invariants of the stream and its consumers.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("stream name must not be empty".to_string()));
        }

        if self.subjects.is_empty() {
            return Err(Error::Config(format!(
                "stream {} must capture at least one subject",
                self.name
            )));
        }

        if self.replicas == 0 {
            return Err(Error::Config(format!(
                "stream {} needs at least one replica",
                self.name
            )));
        }

        for consumer in &self.consumers {
            if consumer.durable.is_empty() {
                return Err(Error::Config(format!(
                    "consumer on stream {} needs a durable name",
                    self.name
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            name: self.name.clone(),
            subjects: self.subjects.clone(),
            storage: self.storage,
            replicas: self.replicas,
        }
    }
}

/// A durable consumer created together with its stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerSpec {
    /// Durable name, unique within the stream.
    pub durable: String,

    /// Acknowledgment policy.
    pub ack_policy: AckPolicy,

    /// Maximum delivery attempts per message.
    pub max_deliver: i64,

    /// How long to wait for an acknowledgment before redelivering.
    pub ack_wait: Duration,

    /// Where the consumer starts in the stream.
    pub deliver_policy: DeliverPolicy,

    /// Cap on unacknowledged messages. `0` uses the broker default.
    pub max_ack_pending: i64,
}

impl ConsumerSpec {
    /// An explicitly acknowledged consumer delivering everything, with five
    /// delivery attempts and a 30 second ack wait.
    pub fn new(durable: impl Into<String>) -> Self {
        Self {
            durable: durable.into(),
            ack_policy: AckPolicy::Explicit,
            max_deliver: DEFAULT_MAX_DELIVER,
            ack_wait: DEFAULT_ACK_WAIT,
            deliver_policy: DeliverPolicy::All,
            max_ack_pending: 0,
        }
    }

    /// Sets the acknowledgment policy.
    #[must_use]
    pub const fn with_ack_policy(mut self, ack_policy: AckPolicy) -> Self {
        self.ack_policy = ack_policy;
        self
    }

    /// Sets the maximum delivery attempts.
    #[must_use]
    pub const fn with_max_deliver(mut self, max_deliver: i64) -> Self {
        self.max_deliver = max_deliver;
        self
    }

    /// Sets the ack wait.
    #[must_use]
    pub const fn with_ack_wait(mut self, ack_wait: Duration) -> Self {
        self.ack_wait = ack_wait;
        self
    }

    /// Sets the deliver policy.
    #[must_use]
    pub const fn with_deliver_policy(mut self, deliver_policy: DeliverPolicy) -> Self {
        self.deliver_policy = deliver_policy;
        self
    }

    /// Sets the cap on unacknowledged messages.
    #[must_use]
    pub const fn with_max_ack_pending(mut self, max_ack_pending: i64) -> Self {
        self.max_ack_pending = max_ack_pending;
        self
    }

    pub(crate) fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            durable: self.durable.clone(),
            ack_policy: self.ack_policy,
            max_deliver: self.max_deliver,
            ack_wait: self.ack_wait,
            deliver_policy: self.deliver_policy,
            max_ack_pending: self.max_ack_pending,
        }
    }
}
