//! Runs an embedded NATS server and declaratively provisions its JetStream
//! streams and consumers.
//!
//! ```no_run
//! use harbor_engine_process::ProcessEngineFactory;
//! use harbor_jetstream_nats::NatsConnector;
//! use harbor_server::{ConsumerSpec, ServerConfig, ServerManager, ServerManagerOptions, StreamSpec};
//!
//! # async fn run() -> Result<(), harbor_server::Error> {
//! let manager = ServerManager::new(ServerManagerOptions {
//!     config: ServerConfig::builder().with_ephemeral_storage().build(),
//!     connector: NatsConnector::default(),
//!     engine_factory: ProcessEngineFactory::default(),
//!     streams: vec![
//!         StreamSpec::new("ORDERS")
//!             .with_subjects(["orders.*"])
//!             .with_consumer(ConsumerSpec::new("billing")),
//!     ],
//! });
//!
//! manager.start().await?;
//! manager.stop().await;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod logger;
mod manager;
mod provisioner;

pub use config::{ConsumerSpec, ServerConfig, ServerConfigBuilder, StreamSpec};
pub use error::{BoxError, Error, ProvisioningStage, Result};
pub use harbor_engine::{Authorization, NkeyUser, Permissions, User};
pub use harbor_jetstream::{AckPolicy, DeliverPolicy, Endpoint, StorageType};
pub use logger::TracingLogger;
pub use manager::{ServerManager, ServerManagerOptions, ServerState};
pub use provisioner::Provisioner;
