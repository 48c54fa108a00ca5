//! Beacon domain types.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::config::ServerAddr;
use crate::error::BeaconError;

/// Status recorded on samples built from a failed probe.
pub const STATUS_ERROR: &str = "error";

/// Identity of one monitoring session.
///
/// Opaque and immutable; generated once per session and shared read-only
/// by every report emitted during it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point-in-time snapshot of the inference server's health.
///
/// Relayed intact from probe to management plane; nothing in between
/// interprets `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSample {
    /// Status string as reported by the server (e.g. "ok", "loading model").
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots_idle: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots_processing: Option<u32>,
    /// Set when the probe itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Observation time, milliseconds since the Unix epoch.
    pub observed_at_ms: u64,
}

impl HealthSample {
    pub fn new(status: impl Into<String>, observed_at_ms: u64) -> Self {
        Self {
            status: status.into(),
            slots_idle: None,
            slots_processing: None,
            error: None,
            observed_at_ms,
        }
    }

    /// Sample describing a probe that could not observe the server.
    pub fn failed(error: impl Into<String>, observed_at_ms: u64) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(STATUS_ERROR, observed_at_ms)
        }
    }

    pub fn with_slots(mut self, idle: Option<u32>, processing: Option<u32>) -> Self {
        self.slots_idle = idle;
        self.slots_processing = processing;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// The external address advertised to the management plane alongside
/// each report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub external_addr: ServerAddr,
}

/// A caller-visible notification of a non-blocking failure or a
/// terminal condition.
#[derive(Debug)]
pub struct ResultEvent {
    pub comment: String,
    pub error: Option<BeaconError>,
}

impl ResultEvent {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            error: None,
        }
    }

    pub fn with_error(comment: impl Into<String>, error: BeaconError) -> Self {
        Self {
            comment: comment.into(),
            error: Some(error),
        }
    }
}

impl fmt::Display for ResultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(err) => write!(f, "{}: {err}", self.comment),
            None => f.write_str(&self.comment),
        }
    }
}

/// Write side of the upward event stream owned by the supervisor.
pub type ResultSink = mpsc::Sender<ResultEvent>;

/// What happened to an event pushed with [`emit_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitted {
    Sent,
    /// The supervisor dropped its receiver.
    Closed,
    /// The sink stayed full until `cancel` fired.
    Cancelled,
}

/// Push `event` to the sink, waiting for room only until `cancel` fires.
///
/// An event that fits is always sent, even after cancellation.
pub async fn emit_result(
    results: &ResultSink,
    event: ResultEvent,
    cancel: &CancellationToken,
) -> Emitted {
    let event = match results.try_send(event) {
        Ok(()) => return Emitted::Sent,
        Err(TrySendError::Closed(_)) => return Emitted::Closed,
        Err(TrySendError::Full(event)) => event,
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Emitted::Cancelled,
        sent = results.send(event) => match sent {
            Ok(()) => Emitted::Sent,
            Err(_) => Emitted::Closed,
        },
    }
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
