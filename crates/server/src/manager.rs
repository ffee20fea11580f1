use std::sync::Arc;

use async_trait::async_trait;
use harbor_bootable::Bootable;
use harbor_engine::{Engine, EngineFactory};
use harbor_jetstream::Connector;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, StreamSpec};
use crate::error::{Error, Result};
use crate::logger::TracingLogger;
use crate::provisioner::Provisioner;

/// Where the manager is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerState {
    /// No engine is held.
    Stopped,

    /// An engine is being launched or provisioned. A manager whose
    /// provisioning failed stays here until stopped.
    Starting,

    /// The engine accepts connections and every stream exists.
    Ready,
}

/// Options for configuring a `ServerManager`.
pub struct ServerManagerOptions<F, C>
where
    F: EngineFactory,
    C: Connector,
{
    /// Server configuration.
    pub config: ServerConfig,

    /// Connector the provisioner uses to reach the engine.
    pub connector: C,

    /// Creates the engine on every start.
    pub engine_factory: F,

    /// Streams to create once the engine is ready. Ignored when JetStream is off.
    pub streams: Vec<StreamSpec>,
}

struct Inner<E> {
    engine: Option<E>,
    state: ServerState,
}

/// Runs one embedded engine and provisions its streams.
pub struct ServerManager<F, C>
where
    F: EngineFactory,
    C: Connector,
{
    config: ServerConfig,
    engine_factory: F,
    inner: Mutex<Inner<F::Engine>>,
    logger: Arc<TracingLogger>,
    provisioner: Provisioner<C>,
    streams: Vec<StreamSpec>,
}

impl<F, C> ServerManager<F, C>
where
    F: EngineFactory,
    C: Connector,
{
    /// Creates a new `ServerManager`.
    ///
    /// Engine output is logged to the `tracing` dispatcher current at this call.
    pub fn new(
        ServerManagerOptions {
            config,
            connector,
            engine_factory,
            streams,
        }: ServerManagerOptions<F, C>,
    ) -> Self {
        let streams = if config.jetstream {
            streams
        } else {
            if !streams.is_empty() {
                warn!("jetstream is disabled, ignoring {} stream(s)", streams.len());
            }
            Vec::new()
        };

        Self {
            config,
            engine_factory,
            inner: Mutex::new(Inner {
                engine: None,
                state: ServerState::Stopped,
            }),
            logger: Arc::new(TracingLogger::current()),
            provisioner: Provisioner::new(connector),
            streams,
        }
    }

    /// The current lifecycle state.
    pub async fn state(&self) -> ServerState {
        self.inner.lock().await.state
    }

    /// Starts the engine, waits for it to accept connections and provisions
    /// the configured streams.
    ///
    /// A provisioning failure leaves the engine running; call [`Self::stop`]
    /// to tear it down.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the configuration is structurally invalid.
    /// - `Error::AlreadyStarted` if an engine is already held.
    /// - `Error::Start` if the engine could not be created or launched.
    /// - `Error::ReadinessTimeout` if it did not accept connections in time.
    /// - `Error::Connection` or `Error::Provisioning` if provisioning failed.
    pub async fn start(&self) -> Result<()> {
        self.config.validate()?;
        for stream in &self.streams {
            stream.validate()?;
        }

        // A random port is only known to the engine, the provisioner could not reach it.
        if self.config.port == 0 && !self.streams.is_empty() {
            return Err(Error::Config(
                "streams cannot be provisioned on a random port (port 0)".to_string(),
            ));
        }

        let mut inner = self.inner.lock().await;

        if inner.engine.is_some() {
            return Err(Error::AlreadyStarted);
        }

        inner.state = ServerState::Starting;

        let engine = match self.launch().await {
            Ok(engine) => engine,
            Err(e) => {
                inner.state = ServerState::Stopped;
                return Err(e);
            }
        };

        engine.set_logger(self.logger.clone(), self.config.trace, self.config.debug);
        inner.engine = Some(engine);

        let endpoint = self.config.endpoint();
        self.provisioner.apply(&endpoint, &self.streams).await?;

        inner.state = ServerState::Ready;

        info!("nats server ready on {}", endpoint);

        Ok(())
    }

    async fn launch(&self) -> Result<F::Engine> {
        let engine = self
            .engine_factory
            .create(self.config.engine_config())
            .await
            .map_err(|e| Error::Start(Box::new(e)))?;

        engine.start().map_err(|e| Error::Start(Box::new(e)))?;

        let ready_timeout = self.config.ready_timeout;
        let ready = tokio::time::timeout(ready_timeout, engine.ready_for_connections(ready_timeout))
            .await
            .unwrap_or(false);

        if !ready {
            warn!("nats server not ready after {:?}, abandoning it", ready_timeout);
            return Err(Error::ReadinessTimeout(ready_timeout));
        }

        debug!("nats server accepting connections");

        Ok(engine)
    }

    /// Shuts the engine down and waits for it. Does nothing if none is held.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;

        let Some(engine) = inner.engine.take() else {
            return;
        };

        info!("stopping nats server...");

        engine.shutdown().await;
        inner.state = ServerState::Stopped;

        info!("nats server stopped");
    }
}

#[async_trait]
impl<F, C> Bootable for ServerManager<F, C>
where
    F: EngineFactory,
    C: Connector,
{
    type Error = Error;

    fn bootable_name(&self) -> &str {
        "nats-server"
    }

    async fn start(&self) -> Result<()> {
        Self::start(self).await
    }

    async fn shutdown(&self) {
        self.stop().await;
    }
}
