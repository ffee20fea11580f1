//! Abstract interface for services a host process boots and tears down.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use async_trait::async_trait;

/// Trait for bootable services.
///
/// Starting may fail and the failure is handed back to the caller untouched.
/// Shutting down is best-effort: implementations log their own problems and
/// always leave the service in a state where `start` can be called again.
#[async_trait]
pub trait Bootable
where
    Self: Send + Sync + 'static,
{
    /// The error returned when the service fails to start.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get the name of the bootable service.
    fn bootable_name(&self) -> &str;

    /// Start the bootable service.
    async fn start(&self) -> Result<(), Self::Error>;

    /// Shutdown the bootable service. A service that is not running is left alone.
    async fn shutdown(&self);
}
