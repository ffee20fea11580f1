use std::fmt;

/// The logging interface an engine writes its internal messages to.
///
/// Each method receives an already interpolated message and must emit it
/// exactly once before returning.
pub trait EngineLogger
where
    Self: Send + Sync + 'static,
{
    /// Regular operational notices.
    fn notice(&self, args: fmt::Arguments<'_>);

    /// Warnings.
    fn warn(&self, args: fmt::Arguments<'_>);

    /// Fatal conditions. Logging one does not terminate the host.
    fn fatal(&self, args: fmt::Arguments<'_>);

    /// Errors.
    fn error(&self, args: fmt::Arguments<'_>);

    /// Debug output, only produced when debug logging is enabled on the engine.
    fn debug(&self, args: fmt::Arguments<'_>);

    /// Protocol tracing, only produced when tracing is enabled on the engine.
    fn trace(&self, args: fmt::Arguments<'_>);
}
