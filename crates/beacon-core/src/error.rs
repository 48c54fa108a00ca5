//! Error types for the Beacon agent.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for Beacon operations.
pub type BeaconResult<T> = Result<T, BeaconError>;

/// Errors surfaced by the agent and its collaborators.
///
/// Only [`BeaconError::Identity`] ends a monitoring session; every other
/// variant travels upward inside a `ResultEvent` or a failed sample.
#[derive(Debug, Error)]
pub enum BeaconError {
    #[error("identity generation failed: {0}")]
    Identity(String),

    #[error("health probe failed: {0}")]
    Probe(String),

    #[error("status delivery failed: {0}")]
    Delivery(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("deadline of {0:?} elapsed")]
    DeadlineElapsed(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("background task failed: {0}")]
    Task(String),
}
