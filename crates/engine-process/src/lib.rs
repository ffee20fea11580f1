//! Runs `nats-server` as a supervised child process behind the engine contract.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod render;

pub use error::Error;

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use harbor_engine::{Engine, EngineConfig, EngineFactory, EngineLogger};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use regex::Regex;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Regex pattern for matching NATS server log lines
static LOG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\d+\] \d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}\.\d{6} (\[[A-Z]+\]) (.*)")
        .expect("Invalid regex pattern")
});

/// Logged by the server once its client listener accepts connections.
const READY_MESSAGE: &str = "Server is ready";

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for configuring a `ProcessEngineFactory`.
#[derive(Clone, Debug)]
pub struct ProcessEngineOptions {
    /// Directory containing the `nats-server` binary. Looked up on `PATH` when `None`.
    pub bin_dir: Option<PathBuf>,

    /// How long to wait for a graceful exit before killing the process.
    pub shutdown_timeout: Duration,
}

impl Default for ProcessEngineOptions {
    fn default() -> Self {
        Self {
            bin_dir: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Creates engines backed by a `nats-server` child process.
#[derive(Clone, Debug, Default)]
pub struct ProcessEngineFactory {
    options: ProcessEngineOptions,
}

impl ProcessEngineFactory {
    /// Creates a new `ProcessEngineFactory` with the specified options.
    #[must_use]
    pub const fn new(options: ProcessEngineOptions) -> Self {
        Self { options }
    }

    fn resolve_executable(&self) -> Result<PathBuf, Error> {
        match &self.options.bin_dir {
            Some(bin_dir) => {
                let executable = bin_dir.join("nats-server");
                if executable.is_file() {
                    Ok(executable)
                } else {
                    Err(Error::BinaryNotFound)
                }
            }
            None => which::which("nats-server").map_err(|_| Error::BinaryNotFound),
        }
    }
}

#[async_trait]
impl EngineFactory for ProcessEngineFactory {
    type Engine = ProcessEngine;
    type Error = Error;

    async fn create(&self, config: EngineConfig) -> Result<ProcessEngine, Error> {
        let executable = self.resolve_executable()?;

        // The child only reports a taken port after it has been launched, so
        // check up front while the failure can still be attributed to creation.
        ensure_port_available(&config.host, config.port)?;

        let work_dir = TempDir::with_prefix("harbor-nats-")
            .map_err(|e| Error::Io("failed to create working directory", e))?;

        let store_dir = match &config.store_dir {
            Some(store_dir) => store_dir.clone(),
            None => work_dir.path().join("jetstream"),
        };

        if config.jetstream {
            tokio::fs::create_dir_all(&store_dir)
                .await
                .map_err(|e| Error::Io("failed to create jetstream directory", e))?;
        }

        let server_name = config
            .server_name
            .clone()
            .unwrap_or_else(|| format!("harbor-{}", config.port));

        let config_path = work_dir.path().join("nats-server.conf");
        tokio::fs::write(
            &config_path,
            render::render_config(&config, &server_name, &store_dir),
        )
        .await
        .map_err(|e| Error::Io("failed to write nats-server.conf", e))?;

        debug!("prepared nats server {} in {}", server_name, work_dir.path().display());

        Ok(ProcessEngine {
            config_path,
            executable,
            exited: CancellationToken::new(),
            log_sink: Arc::new(LogSink::new(config.no_log)),
            no_sigs: config.no_sigs,
            ready: CancellationToken::new(),
            shutdown_timeout: self.options.shutdown_timeout,
            shutdown_token: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
            _work_dir: work_dir,
        })
    }
}

fn ensure_port_available(host: &str, port: u16) -> Result<(), Error> {
    // Port 0 is rendered as a random port, nothing to check.
    if port == 0 {
        return Ok(());
    }

    TcpListener::bind((host, port))
        .map(drop)
        .map_err(|source| Error::PortInUse {
            host: host.to_string(),
            port,
            source,
        })
}

/// A `nats-server` child process.
///
/// Dropping the engine without shutting it down terminates the child.
pub struct ProcessEngine {
    config_path: PathBuf,
    executable: PathBuf,
    exited: CancellationToken,
    log_sink: Arc<LogSink>,
    no_sigs: bool,
    ready: CancellationToken,
    shutdown_timeout: Duration,
    shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
    _work_dir: TempDir,
}

impl std::fmt::Debug for ProcessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEngine")
            .field("config_path", &self.config_path)
            .field("executable", &self.executable)
            .finish_non_exhaustive()
    }
}

impl ProcessEngine {
    /// Path of the generated server configuration file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn pump_output<R>(&self, output: R)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let log_sink = self.log_sink.clone();
        let ready = self.ready.clone();

        self.task_tracker.spawn(async move {
            let mut lines = BufReader::new(output).lines();

            while let Ok(Some(line)) = lines.next_line().await {
                if !ready.is_cancelled() && line.contains(READY_MESSAGE) {
                    ready.cancel();
                }

                log_sink.forward(&line);
            }
        });
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    type Error = Error;

    fn start(&self) -> Result<(), Error> {
        if self.task_tracker.is_closed() {
            return Err(Error::AlreadyStarted);
        }

        let mut cmd = Command::new(&self.executable);
        cmd.arg("--config")
            .arg(&self.config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Keep terminal signals aimed at the host away from the server.
        #[cfg(unix)]
        if self.no_sigs {
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(Error::Spawn)?;

        if let Some(stdout) = child.stdout.take() {
            self.pump_output(stdout);
        }

        if let Some(stderr) = child.stderr.take() {
            self.pump_output(stderr);
        }

        let exited = self.exited.clone();
        let shutdown_token = self.shutdown_token.clone();
        let shutdown_timeout = self.shutdown_timeout;

        self.task_tracker.spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) if status.success() => info!("nats server exited with status: {}", status),
                        Ok(status) => error!("nats server exited with non-zero status: {}", status),
                        Err(e) => error!("failed to wait for nats server: {}", e),
                    }
                }
                () = shutdown_token.cancelled() => {
                    if let Some(raw_pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
                        if let Err(e) = signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
                            warn!("failed to send SIGTERM to nats server: {}", e);
                        }
                    }

                    if let Ok(result) = tokio::time::timeout(shutdown_timeout, child.wait()).await {
                        match result {
                            Ok(status) => debug!("nats server exited with status: {}", status),
                            Err(e) => error!("failed to wait for nats server: {}", e),
                        }
                    } else {
                        error!("timeout waiting for nats server to exit, killing...");
                        if let Err(e) = child.kill().await {
                            error!("failed to kill nats server: {}", e);
                        }
                    }
                }
            }

            exited.cancel();
        });

        self.task_tracker.close();

        Ok(())
    }

    async fn ready_for_connections(&self, timeout: Duration) -> bool {
        tokio::select! {
            () = self.ready.cancelled() => true,
            () = self.exited.cancelled() => self.ready.is_cancelled(),
            () = tokio::time::sleep(timeout) => false,
        }
    }

    fn set_logger(&self, logger: Arc<dyn EngineLogger>, trace: bool, debug: bool) {
        self.log_sink.register(logger, trace, debug);
    }

    async fn shutdown(&self) {
        // Never launched: nothing is tracked and waiting would never return.
        if !self.task_tracker.is_closed() {
            return;
        }

        info!("nats server shutting down...");

        self.shutdown_token.cancel();
        self.task_tracker.wait().await;

        info!("nats server shutdown");
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

struct RegisteredLogger {
    debug: bool,
    logger: Arc<dyn EngineLogger>,
    trace: bool,
}

/// Where server output goes: stderr until a logger is registered, the logger afterwards.
struct LogSink {
    logger: RwLock<Option<RegisteredLogger>>,
    no_log: bool,
}

impl LogSink {
    const fn new(no_log: bool) -> Self {
        Self {
            logger: RwLock::new(None),
            no_log,
        }
    }

    fn register(&self, logger: Arc<dyn EngineLogger>, trace: bool, debug: bool) {
        let registered = RegisteredLogger {
            debug,
            logger,
            trace,
        };

        match self.logger.write() {
            Ok(mut guard) => *guard = Some(registered),
            Err(poisoned) => *poisoned.into_inner() = Some(registered),
        }
    }

    fn forward(&self, line: &str) {
        let guard = match self.logger.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match guard.as_ref() {
            Some(registered) => forward_line(registered, line),
            None if !self.no_log => {
                eprintln!("{line}");
            }
            None => {}
        }
    }
}

fn forward_line(registered: &RegisteredLogger, line: &str) {
    let logger = &registered.logger;

    let Some(caps) = LOG_REGEX.captures(line) else {
        logger.error(format_args!("{line}"));
        return;
    };

    let label = caps.get(1).map_or("[UKW]", |m| m.as_str());
    let message = caps.get(2).map_or(line, |m| m.as_str());

    match label {
        "[INF]" => logger.notice(format_args!("{message}")),
        "[WRN]" => logger.warn(format_args!("{message}")),
        "[FTL]" => logger.fatal(format_args!("{message}")),
        "[ERR]" => logger.error(format_args!("{message}")),
        "[DBG]" => {
            if registered.debug {
                logger.debug(format_args!("{message}"));
            }
        }
        "[TRC]" => {
            if registered.trace {
                logger.trace(format_args!("{message}"));
            }
        }
        _ => logger.error(format_args!("{line}")),
    }
}
