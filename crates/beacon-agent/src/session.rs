//! Monitoring session — one identity, one poller, one reporter.
//!
//! A session generates its identity, spawns the [`Poller`] into a task
//! group, and runs the [`Reporter`] in the caller's task until the
//! handoff channel closes. Cancelling the caller's token stops the
//! poller, which closes the channel, which ends the reporter.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_core::{
    AgentConfig, BeaconError, Emitted, ResultEvent, ResultSink, TargetConfig, emit_result,
};
use beacon_probe::Probe;
use beacon_report::Deliver;

use crate::handoff;
use crate::identity::{IdentityProvider, UuidV7};
use crate::poller::Poller;
use crate::reporter::Reporter;

pub const IDENTITY_FAILED: &str = "failed to generate agent session id";
pub const POLLER_FAILED: &str = "poller task failed";

/// Settings a session needs from the agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub agent_name: Option<String>,
    /// Tick cadence and per-call deadline for both probe and report;
    /// must be non-zero.
    pub reporting_interval: Duration,
    pub target: TargetConfig,
}

impl From<&AgentConfig> for SessionConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            agent_name: config.name.clone(),
            reporting_interval: config.reporting_interval,
            target: config.target(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Running,
    Terminated,
}

pub struct MonitoringSession<P, D, I = UuidV7> {
    config: SessionConfig,
    probe: Arc<P>,
    deliver: Arc<D>,
    identity: I,
    state: watch::Sender<SessionState>,
}

impl<P, D> MonitoringSession<P, D>
where
    P: Probe + 'static,
    D: Deliver,
{
    pub fn new(config: SessionConfig, probe: Arc<P>, deliver: Arc<D>) -> Self {
        Self::with_identity(config, probe, deliver, UuidV7)
    }
}

impl<P, D, I> MonitoringSession<P, D, I>
where
    P: Probe + 'static,
    D: Deliver,
    I: IdentityProvider,
{
    pub fn with_identity(config: SessionConfig, probe: Arc<P>, deliver: Arc<D>, identity: I) -> Self {
        let (state, _) = watch::channel(SessionState::Init);
        Self {
            config,
            probe,
            deliver,
            identity,
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run one monitoring session until `shutdown` fires.
    ///
    /// Nothing is returned: failures reach the caller through `results`.
    /// An identity failure ends the session before any probe or report.
    pub async fn observe_and_report(&self, results: ResultSink, shutdown: CancellationToken) {
        let interval = self.config.reporting_interval;
        self.state.send_replace(SessionState::Init);
        debug!(
            external_addr = %self.config.target.external_addr,
            ?interval,
            "observing"
        );

        let session_id = match self.identity.generate() {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "session aborted before start");
                emit(&results, ResultEvent::with_error(IDENTITY_FAILED, e), &shutdown).await;
                self.state.send_replace(SessionState::Terminated);
                return;
            }
        };

        let session_token = shutdown.child_token();
        let (samples_tx, samples_rx) = handoff::channel();

        let mut tasks = JoinSet::new();
        let poller = Poller::new(Arc::clone(&self.probe), interval);
        tasks.spawn(poller.run(samples_tx, session_token.clone()));

        self.state.send_replace(SessionState::Running);
        info!(%session_id, ?interval, "monitoring session started");

        let reporter = Reporter::new(
            Arc::clone(&self.deliver),
            interval,
            self.config.target.clone(),
            session_id,
            self.config.agent_name.clone(),
        );
        let reported = reporter.run(samples_rx, &results, &session_token).await;
        let session_id = reporter.session_id();

        // The handoff is closed; make sure nothing is left producing.
        session_token.cancel();
        let mut produced = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(n) => produced += n,
                Err(e) => {
                    error!(%session_id, error = %e, "poller task failed");
                    emit(
                        &results,
                        ResultEvent::with_error(POLLER_FAILED, BeaconError::Task(e.to_string())),
                        &shutdown,
                    )
                    .await;
                }
            }
        }

        self.state.send_replace(SessionState::Terminated);
        info!(%session_id, produced, reported, "monitoring session ended");
    }
}

async fn emit(results: &ResultSink, event: ResultEvent, shutdown: &CancellationToken) {
    match emit_result(results, event, shutdown).await {
        Emitted::Sent => {}
        Emitted::Closed => warn!("result sink closed; dropping event"),
        Emitted::Cancelled => warn!("result sink full at shutdown; dropping event"),
    }
}
