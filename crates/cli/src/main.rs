//! CLI binary to run an embedded NATS server with provisioned JetStream streams.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod streams_file;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use harbor_engine_process::{ProcessEngineFactory, ProcessEngineOptions};
use harbor_jetstream_nats::{ClientCredentials, NatsConnector, NatsConnectorOptions};
use harbor_server::{Authorization, ServerConfig, ServerManager, ServerManagerOptions, User};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// Server library error
    #[error(transparent)]
    Server(#[from] harbor_server::Error),

    /// Streams file is not valid TOML or has unknown fields
    #[error("invalid streams file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Streams file is well-formed but inconsistent
    #[error("invalid streams file: {0}")]
    StreamsFile(String),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Shared token clients must present
    #[arg(long, env = "HARBOR_AUTH_TOKEN", conflicts_with = "username")]
    auth_token: Option<String>,

    /// Directory containing the nats-server binary (defaults to PATH lookup)
    #[arg(long, env = "HARBOR_BIN_DIR")]
    bin_dir: Option<PathBuf>,

    /// Enable debug output from the server
    #[arg(long, env = "HARBOR_DEBUG")]
    debug: bool,

    /// Keep JetStream data in a temporary directory
    #[arg(long, env = "HARBOR_EPHEMERAL", conflicts_with = "store_dir")]
    ephemeral: bool,

    /// Host to listen on
    #[arg(long, default_value = "localhost", env = "HARBOR_HOST")]
    host: String,

    /// Disable JetStream
    #[arg(long, env = "HARBOR_NO_JETSTREAM")]
    no_jetstream: bool,

    /// Suppress server output before the logger is attached
    #[arg(long, env = "HARBOR_NO_LOG")]
    no_log: bool,

    /// Password for --username
    #[arg(long, env = "HARBOR_PASSWORD", requires = "username")]
    password: Option<String>,

    /// Port to listen on
    #[arg(long, default_value_t = 4222, env = "HARBOR_PORT")]
    port: u16,

    /// Seconds to wait for the server to accept connections
    #[arg(long, default_value_t = 10, env = "HARBOR_READY_TIMEOUT_SECS")]
    ready_timeout_secs: u64,

    /// Name the server advertises
    #[arg(long, env = "HARBOR_SERVER_NAME")]
    server_name: Option<String>,

    /// JetStream storage directory
    #[arg(long, env = "HARBOR_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// TOML file describing streams and consumers to create
    #[arg(long, env = "HARBOR_STREAMS_FILE")]
    streams_file: Option<PathBuf>,

    /// Enable protocol traces from the server
    #[arg(long, env = "HARBOR_TRACE")]
    trace: bool,

    /// Username clients must present
    #[arg(long, env = "HARBOR_USERNAME", requires = "password")]
    username: Option<String>,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut builder = ServerConfig::builder()
            .with_debug(self.debug)
            .with_host(self.host.clone())
            .with_jetstream(!self.no_jetstream)
            .with_no_log(self.no_log)
            .with_port(self.port)
            .with_ready_timeout(Duration::from_secs(self.ready_timeout_secs))
            .with_trace(self.trace);

        if let Some(server_name) = &self.server_name {
            builder = builder.with_server_name(server_name.clone());
        }

        if let Some(store_dir) = &self.store_dir {
            builder = builder.with_store_dir(store_dir.clone());
        } else if self.ephemeral {
            builder = builder.with_ephemeral_storage();
        }

        if let Some(token) = &self.auth_token {
            builder = builder.with_authorization(Authorization::Token(token.clone()));
        } else if let (Some(username), Some(password)) = (&self.username, &self.password) {
            builder = builder.with_authorization(Authorization::Users {
                users: vec![User::new(username.clone(), password.clone())],
                system_user: None,
            });
        }

        builder.build()
    }

    fn client_credentials(&self) -> Option<ClientCredentials> {
        if let Some(token) = &self.auth_token {
            return Some(ClientCredentials::Token(token.clone()));
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(ClientCredentials::UserPassword {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let streams = match &args.streams_file {
        Some(path) => streams_file::load(path).await?,
        None => Vec::new(),
    };

    let manager = ServerManager::new(ServerManagerOptions {
        config: args.server_config(),
        connector: NatsConnector::new(NatsConnectorOptions {
            credentials: args.client_credentials(),
            ..NatsConnectorOptions::default()
        }),
        engine_factory: ProcessEngineFactory::new(ProcessEngineOptions {
            bin_dir: args.bin_dir.clone(),
            ..ProcessEngineOptions::default()
        }),
        streams,
    });

    if let Err(e) = manager.start().await {
        error!("failed to start server: {}", e);
        // Provisioning failures leave the server running.
        manager.stop().await;
        return Err(e.into());
    }

    wait_for_shutdown_signal().await?;

    info!("Shutting down");
    manager.stop().await;

    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<(), Error> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| Error::Io("failed to install SIGTERM handler", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| Error::Io("failed to install SIGINT handler", e))?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::Io("failed to listen for interrupt", e))?;
        info!("Received interrupt signal");
    }

    Ok(())
}
