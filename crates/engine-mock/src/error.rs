use thiserror::Error;

/// Scripted failures produced by the mock engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The factory was told to reject the configuration.
    #[error("mock engine rejected configuration: {0}")]
    Create(String),

    /// The engine was told to fail its launch.
    #[error("mock engine failed to start: {0}")]
    Start(String),
}
