//! Agent mode — runs next to an inference server.
//!
//! In this mode, the daemon:
//! 1. Builds the HTTP health probe and the management client
//! 2. Starts a supervisor that logs every result event
//! 3. Runs monitoring sessions until SIGINT/SIGTERM, starting a new
//!    session (with a new identity) whenever one ends early

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_agent::{IdentityProvider, MonitoringSession, SessionConfig, SessionState};
use beacon_core::{AgentConfig, ResultEvent, ResultSink};
use beacon_probe::{LlamaCppProbe, Probe};
use beacon_report::{Deliver, ManagementClient};

/// Pause before a session that ended on its own is started again.
pub const SESSION_RESTART_DELAY: Duration = Duration::from_secs(1);

const RESULT_BUFFER: usize = 64;

/// Run the agent until a shutdown signal arrives.
pub async fn run_agent(config: AgentConfig) -> anyhow::Result<()> {
    info!(
        local_addr = %config.local_addr,
        external_addr = %config.external_addr,
        management_addr = %config.management_addr,
        interval = ?config.reporting_interval,
        "Beacon daemon starting in agent mode"
    );

    let probe = Arc::new(LlamaCppProbe::new(
        config.local_addr.clone(),
        config.api_key.clone(),
    )?);
    let client = Arc::new(ManagementClient::new(config.management_addr.clone()));
    let session = MonitoringSession::new(SessionConfig::from(&config), probe, client);
    let state_log = tokio::spawn(log_state_changes(session.subscribe()));

    // ── Shutdown signal ──────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let signal_handle = tokio::spawn(wait_for_signal(shutdown.clone()));

    // ── Result supervisor ────────────────────────────────────────
    let (results_tx, results_rx) = mpsc::channel(RESULT_BUFFER);
    let supervisor = tokio::spawn(supervise_results(results_rx));

    // ── Sessions ─────────────────────────────────────────────────
    let sessions = run_sessions(&session, results_tx, &shutdown, SESSION_RESTART_DELAY).await;

    signal_handle.abort();
    let events = supervisor.await?;
    drop(session);
    state_log.await?;

    info!(sessions, events, "agent stopped");
    Ok(())
}

/// Run sessions back to back until `shutdown` fires.
///
/// Returns the number of sessions run. `results` is dropped on return,
/// which ends the supervisor.
pub async fn run_sessions<P, D, I>(
    session: &MonitoringSession<P, D, I>,
    results: ResultSink,
    shutdown: &CancellationToken,
    restart_delay: Duration,
) -> u32
where
    P: Probe + 'static,
    D: Deliver,
    I: IdentityProvider,
{
    let mut sessions = 0;
    loop {
        session
            .observe_and_report(results.clone(), shutdown.clone())
            .await;
        sessions += 1;

        if shutdown.is_cancelled() {
            break;
        }

        warn!(restart_in = ?restart_delay, "monitoring session ended; restarting");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(restart_delay) => {}
        }
    }
    sessions
}

/// Log every result event until all senders are gone.
///
/// Returns the number of events seen.
pub async fn supervise_results(mut results: mpsc::Receiver<ResultEvent>) -> u64 {
    let mut seen = 0u64;
    while let Some(event) = results.recv().await {
        seen += 1;
        match &event.error {
            Some(e) => error!(comment = %event.comment, error = %e, "agent failure"),
            None => warn!(comment = %event.comment, "agent event"),
        }
    }
    seen
}

/// Log session state transitions until the session is dropped.
///
/// Returns the last state seen.
pub async fn log_state_changes(mut state: watch::Receiver<SessionState>) -> SessionState {
    let mut last = *state.borrow_and_update();
    while state.changed().await.is_ok() {
        last = *state.borrow_and_update();
        debug!(state = ?last, "session state changed");
    }
    last
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => log_ctrl_c(res),
                    _ = sigterm.recv() => info!("received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                log_ctrl_c(tokio::signal::ctrl_c().await);
            }
        }
    }

    #[cfg(not(unix))]
    {
        log_ctrl_c(tokio::signal::ctrl_c().await);
    }

    shutdown.cancel();
}

fn log_ctrl_c(res: std::io::Result<()>) {
    match res {
        Ok(()) => info!("received SIGINT"),
        Err(e) => error!(error = %e, "failed to listen for CTRL+C; shutting down"),
    }
}
