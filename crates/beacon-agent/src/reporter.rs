//! Reporting loop: consumes samples and delivers each one.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use beacon_core::{Deadline, HealthSample, ResultSink, SessionId, TargetConfig};
use beacon_report::Deliver;

use crate::handoff::HandoffReceiver;

pub struct Reporter<D> {
    deliver: Arc<D>,
    interval: Duration,
    target: TargetConfig,
    session_id: SessionId,
    agent_name: Option<String>,
}

impl<D: Deliver> Reporter<D> {
    pub fn new(
        deliver: Arc<D>,
        interval: Duration,
        target: TargetConfig,
        session_id: SessionId,
        agent_name: Option<String>,
    ) -> Self {
        Self {
            deliver,
            interval,
            target,
            session_id,
            agent_name,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Deliver every sample until the handoff channel closes.
    ///
    /// Delivery failures are the deliverer's to surface; the loop always
    /// moves on to the next sample. Returns the number of samples handled.
    pub async fn run(
        &self,
        mut samples: HandoffReceiver,
        results: &ResultSink,
        shutdown: &CancellationToken,
    ) -> u64 {
        let mut reported = 0u64;
        while let Some(sample) = samples.recv().await {
            self.report(sample, results, shutdown).await;
            reported += 1;
        }
        reported
    }

    /// Deliver one sample within a fresh deadline scope.
    pub async fn report(
        &self,
        sample: HealthSample,
        results: &ResultSink,
        shutdown: &CancellationToken,
    ) {
        let deadline = Deadline::new(self.interval, shutdown);
        self.deliver
            .deliver(
                &deadline,
                results,
                &self.target,
                sample,
                &self.session_id,
                self.agent_name.as_deref(),
            )
            .await;
    }
}
