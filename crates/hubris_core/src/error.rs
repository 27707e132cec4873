//! Coordinator error types.

use crate::tick::{Phase, Subscription};

/// Errors surfaced by the coordinator and its subsystems.
///
/// Missing registry entries are not errors; lookups return `Option`.
#[derive(Debug, thiserror::Error)]
pub enum HubrisError {
    /// The configured tick interval is not a positive, finite number of seconds.
    #[error("tick interval must be a positive finite number of seconds, got {0}")]
    InvalidInterval(f64),

    /// The configured frame rate is not a positive, finite number.
    #[error("frame rate must be a positive finite number, got {0}")]
    InvalidFrameRate(f64),

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// A listener failed while the broadcaster was configured to abort the
    /// phase on the first failure.
    #[error("{phase} listener {subscription} failed: {source}")]
    Listener {
        /// The phase being broadcast.
        phase: Phase,
        /// The failing listener.
        subscription: Subscription,
        /// What the listener reported.
        #[source]
        source: anyhow::Error,
    },
}
