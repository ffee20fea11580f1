use std::fmt;

use harbor_engine::EngineLogger;
use tracing::{Dispatch, debug, dispatcher, error, info, warn};

/// Forwards engine log calls to `tracing` with target `nats-server`.
///
/// Events go to the dispatcher that was current when the logger was created,
/// so engine output keeps reaching the host subscriber from any thread.
#[derive(Clone, Debug)]
pub struct TracingLogger {
    dispatch: Dispatch,
}

impl TracingLogger {
    /// Captures the current default dispatcher.
    #[must_use]
    pub fn current() -> Self {
        Self {
            dispatch: dispatcher::get_default(Dispatch::clone),
        }
    }

    /// Uses the given dispatcher.
    #[must_use]
    pub const fn with_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }
}

impl EngineLogger for TracingLogger {
    fn notice(&self, args: fmt::Arguments<'_>) {
        dispatcher::with_default(&self.dispatch, || info!(target: "nats-server", "{}", args));
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        dispatcher::with_default(&self.dispatch, || warn!(target: "nats-server", "{}", args));
    }

    fn fatal(&self, args: fmt::Arguments<'_>) {
        dispatcher::with_default(&self.dispatch, || error!(target: "nats-server", "{}", args));
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        dispatcher::with_default(&self.dispatch, || error!(target: "nats-server", "{}", args));
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        dispatcher::with_default(&self.dispatch, || debug!(target: "nats-server", "{}", args));
    }

    fn trace(&self, args: fmt::Arguments<'_>) {
        dispatcher::with_default(&self.dispatch, || debug!(target: "nats-server", "{}", args));
    }
}
