//! Rendezvous channel between the poller and the reporter.
//!
//! Nothing is buffered: [`HandoffSender::send`] completes only after the
//! receiver has taken the sample, so a slow reporter throttles the poller.
//! The sender is not `Clone`; there is exactly one producer.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use beacon_core::HealthSample;

type Envelope = (HealthSample, oneshot::Sender<()>);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("handoff channel closed")]
pub struct HandoffClosed;

/// Create a connected sender/receiver pair.
pub fn channel() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

#[derive(Debug)]
pub struct HandoffSender {
    tx: mpsc::Sender<Envelope>,
}

impl HandoffSender {
    /// Hand `sample` to the receiver, waiting until it has been taken.
    pub async fn send(&self, sample: HealthSample) -> Result<(), HandoffClosed> {
        let (taken_tx, taken_rx) = oneshot::channel();
        self.tx
            .send((sample, taken_tx))
            .await
            .map_err(|_| HandoffClosed)?;
        taken_rx.await.map_err(|_| HandoffClosed)
    }
}

#[derive(Debug)]
pub struct HandoffReceiver {
    rx: mpsc::Receiver<Envelope>,
}

impl HandoffReceiver {
    /// Take the next sample; `None` once the sender is gone.
    ///
    /// Samples whose send was abandoned before being taken are skipped.
    pub async fn recv(&mut self) -> Option<HealthSample> {
        loop {
            let (sample, taken) = self.rx.recv().await?;
            if taken.send(()).is_ok() {
                return Some(sample);
            }
        }
    }
}
