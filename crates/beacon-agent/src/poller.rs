//! Periodic health polling.
//!
//! The poller owns the handoff sender. On every tick it runs one probe
//! inside a fresh [`Deadline`] and hands the resulting sample to the
//! reporter, waiting until it has been taken. A failed probe is relayed
//! as an error-bearing sample rather than dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use beacon_core::{Deadline, HealthSample, epoch_millis};
use beacon_probe::Probe;

use crate::handoff::HandoffSender;

pub struct Poller<P> {
    probe: Arc<P>,
    interval: Duration,
}

impl<P: Probe> Poller<P> {
    pub fn new(probe: Arc<P>, interval: Duration) -> Self {
        Self { probe, interval }
    }

    /// Poll until `shutdown` fires or the reporter goes away.
    ///
    /// Returns the number of samples handed off.
    pub async fn run(self, samples: HandoffSender, shutdown: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        // Ticks missed while blocked on the reporter are dropped, not replayed.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut produced = 0u64;
        debug!(interval = ?self.interval, "poller started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sample = self.poll_once(&shutdown).await;

            // A sample already taken by the reporter is counted even if
            // shutdown fired in the meantime.
            tokio::select! {
                biased;
                sent = samples.send(sample) => {
                    if sent.is_err() {
                        debug!("handoff closed; poller stopping");
                        break;
                    }
                    produced += 1;
                }
                _ = shutdown.cancelled() => break,
            }
        }

        debug!(produced, "poller stopped");
        produced
    }

    /// Run one probe within a fresh deadline scope.
    pub async fn poll_once(&self, shutdown: &CancellationToken) -> HealthSample {
        let result = {
            let deadline = Deadline::new(self.interval, shutdown);
            self.probe.probe(&deadline).await
        };

        result.unwrap_or_else(|e| {
            debug!(error = %e, "health probe failed");
            HealthSample::failed(e.to_string(), epoch_millis())
        })
    }
}
