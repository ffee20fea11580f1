//! Contract between the broker host and an embedded NATS engine.
//!
//! The host never talks to the broker's internals directly. It hands an
//! [`EngineConfig`] to an [`EngineFactory`], launches the returned [`Engine`],
//! waits for it to accept connections, plugs an [`EngineLogger`] into it and
//! eventually shuts it down.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod logger;

pub use config::{Authorization, EngineConfig, NkeyUser, Permissions, User};
pub use logger::EngineLogger;

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// A single instance of the broker engine.
///
/// An engine is created stopped. `start` launches its accept loop without
/// waiting for it; `ready_for_connections` is the only way to find out whether
/// the launch worked.
#[async_trait]
pub trait Engine
where
    Self: Send + Sync + 'static,
{
    /// Error returned when the engine cannot be launched.
    type Error: StdError + Send + Sync + 'static;

    /// Launches the engine's accept loop. Does not wait for readiness.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop could not be launched at all.
    fn start(&self) -> Result<(), Self::Error>;

    /// Waits up to `timeout` for the engine to accept client connections.
    async fn ready_for_connections(&self, timeout: Duration) -> bool;

    /// Routes the engine's internal log output through `logger`.
    ///
    /// Debug and trace output is only forwarded when the matching flag is set.
    fn set_logger(&self, logger: Arc<dyn EngineLogger>, trace: bool, debug: bool);

    /// Gracefully shuts the engine down and waits until it has stopped.
    async fn shutdown(&self);
}

/// Creates engine instances from their native configuration.
#[async_trait]
pub trait EngineFactory
where
    Self: Send + Sync + 'static,
{
    /// The engine type produced by this factory.
    type Engine: Engine;

    /// Error returned when an engine cannot be created.
    type Error: StdError + Send + Sync + 'static;

    /// Creates a new, not yet started, engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is rejected or the engine cannot be
    /// prepared (missing binary, unwritable directories, ...).
    async fn create(&self, config: EngineConfig) -> Result<Self::Engine, Self::Error>;
}
