//! Scriptable in-process engine for exercising the broker host without a
//! `nats-server` binary.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use harbor_engine::{Engine, EngineConfig, EngineFactory, EngineLogger};

/// Something that happened to an engine created by a [`MockEngineFactory`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockEvent {
    /// An engine was created with this configuration.
    Created(EngineConfig),

    /// `start` was called.
    Started,

    /// A logger was registered with these flags.
    LoggerSet {
        /// Whether trace output is forwarded.
        trace: bool,

        /// Whether debug output is forwarded.
        debug: bool,
    },

    /// `shutdown` was called.
    Shutdown,

    /// The engine was dropped.
    Dropped,
}

#[derive(Clone, Debug)]
enum Readiness {
    After(Duration),
    Never,
}

#[derive(Default)]
struct Shared {
    events: Vec<MockEvent>,
    logger: Option<Arc<dyn EngineLogger>>,
}

/// Produces [`MockEngine`]s and records everything done to them.
#[derive(Clone)]
pub struct MockEngineFactory {
    create_failure: Option<String>,
    readiness: Readiness,
    shared: Arc<Mutex<Shared>>,
    start_failure: Option<String>,
}

impl Default for MockEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngineFactory {
    /// Creates a factory whose engines start and become ready immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            create_failure: None,
            readiness: Readiness::After(Duration::ZERO),
            shared: Arc::new(Mutex::new(Shared::default())),
            start_failure: None,
        }
    }

    /// Makes `create` fail with the given reason.
    #[must_use]
    pub fn with_create_failure(mut self, reason: impl Into<String>) -> Self {
        self.create_failure = Some(reason.into());
        self
    }

    /// Makes `start` fail with the given reason.
    #[must_use]
    pub fn with_start_failure(mut self, reason: impl Into<String>) -> Self {
        self.start_failure = Some(reason.into());
        self
    }

    /// Engines only report readiness after `delay`.
    #[must_use]
    pub const fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.readiness = Readiness::After(delay);
        self
    }

    /// Engines never report readiness.
    #[must_use]
    pub const fn never_ready(mut self) -> Self {
        self.readiness = Readiness::Never;
        self
    }

    /// Everything recorded so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.shared).events.clone()
    }

    /// Number of engines created so far.
    #[must_use]
    pub fn created(&self) -> usize {
        lock(&self.shared)
            .events
            .iter()
            .filter(|event| matches!(event, MockEvent::Created(_)))
            .count()
    }

    /// Number of times any engine was shut down.
    #[must_use]
    pub fn shutdowns(&self) -> usize {
        lock(&self.shared)
            .events
            .iter()
            .filter(|event| matches!(event, MockEvent::Shutdown))
            .count()
    }

    /// The most recently registered logger, if any.
    #[must_use]
    pub fn logger(&self) -> Option<Arc<dyn EngineLogger>> {
        lock(&self.shared).logger.clone()
    }
}

#[async_trait]
impl EngineFactory for MockEngineFactory {
    type Engine = MockEngine;
    type Error = Error;

    async fn create(&self, config: EngineConfig) -> Result<MockEngine, Error> {
        if let Some(reason) = &self.create_failure {
            return Err(Error::Create(reason.clone()));
        }

        lock(&self.shared).events.push(MockEvent::Created(config));

        Ok(MockEngine {
            readiness: self.readiness.clone(),
            shared: self.shared.clone(),
            start_failure: self.start_failure.clone(),
            started: Mutex::new(false),
        })
    }
}

/// An engine that only records what is done to it.
pub struct MockEngine {
    readiness: Readiness,
    shared: Arc<Mutex<Shared>>,
    start_failure: Option<String>,
    started: Mutex<bool>,
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("readiness", &self.readiness)
            .field("start_failure", &self.start_failure)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Engine for MockEngine {
    type Error = Error;

    fn start(&self) -> Result<(), Error> {
        lock(&self.shared).events.push(MockEvent::Started);

        if let Some(reason) = &self.start_failure {
            return Err(Error::Start(reason.clone()));
        }

        *lock(&self.started) = true;

        Ok(())
    }

    async fn ready_for_connections(&self, timeout: Duration) -> bool {
        if !*lock(&self.started) {
            return false;
        }

        match self.readiness {
            Readiness::After(delay) if delay <= timeout => {
                tokio::time::sleep(delay).await;
                true
            }
            Readiness::After(_) | Readiness::Never => {
                tokio::time::sleep(timeout).await;
                false
            }
        }
    }

    fn set_logger(&self, logger: Arc<dyn EngineLogger>, trace: bool, debug: bool) {
        let mut shared = lock(&self.shared);
        shared.events.push(MockEvent::LoggerSet { trace, debug });
        shared.logger = Some(logger);
    }

    async fn shutdown(&self) {
        lock(&self.shared).events.push(MockEvent::Shutdown);
        *lock(&self.started) = false;
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        lock(&self.shared).events.push(MockEvent::Dropped);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
