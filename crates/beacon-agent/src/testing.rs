//! Scripted collaborators shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use beacon_core::{
    BeaconError, BeaconResult, Deadline, HealthSample, ResultEvent, ResultSink, ServerAddr,
    SessionId, TargetConfig, emit_result,
};
use beacon_probe::{Probe, ProbeFuture};
use beacon_report::{Deliver, DeliverFuture};

use crate::identity::IdentityProvider;

pub fn target() -> TargetConfig {
    TargetConfig {
        external_addr: ServerAddr::new("10.0.0.5", 8080),
    }
}

/// Probe returning `ok` samples numbered by call order, or always failing.
pub struct CountingProbe {
    fail: bool,
    panic: bool,
    calls: AtomicU64,
    budgets: Mutex<Vec<Duration>>,
    scopes: Mutex<Vec<CancellationToken>>,
}

impl CountingProbe {
    fn new(fail: bool, panic: bool) -> Self {
        Self {
            fail,
            panic,
            calls: AtomicU64::new(0),
            budgets: Mutex::new(Vec::new()),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(false, false)
    }

    pub fn failing() -> Self {
        Self::new(true, false)
    }

    pub fn panicking() -> Self {
        Self::new(false, true)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn budgets(&self) -> Vec<Duration> {
        self.budgets.lock().unwrap().clone()
    }

    pub fn all_released(&self) -> bool {
        self.scopes.lock().unwrap().iter().all(|t| t.is_cancelled())
    }
}

impl Probe for CountingProbe {
    fn probe<'a>(&'a self, deadline: &'a Deadline) -> ProbeFuture<'a> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.budgets.lock().unwrap().push(deadline.budget());
            self.scopes.lock().unwrap().push(deadline.token().clone());

            if self.panic {
                panic!("probe exploded");
            }
            if self.fail {
                return Err(BeaconError::Probe("connection refused".to_string()));
            }
            Ok(HealthSample::new("ok", n))
        })
    }
}

#[derive(Debug, Clone)]
pub struct Delivered {
    pub budget: Duration,
    pub target: TargetConfig,
    pub sample: HealthSample,
    pub session_id: SessionId,
    pub agent_name: Option<String>,
}

/// Deliverer that records every call and optionally rejects all of them.
pub struct RecordingDeliver {
    fail: bool,
    calls: Mutex<Vec<Delivered>>,
    scopes: Mutex<Vec<CancellationToken>>,
}

impl RecordingDeliver {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: Mutex::new(Vec::new()),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(false)
    }

    pub fn failing() -> Self {
        Self::new(true)
    }

    pub fn calls(&self) -> Vec<Delivered> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn all_released(&self) -> bool {
        self.scopes.lock().unwrap().iter().all(|t| t.is_cancelled())
    }
}

impl Deliver for RecordingDeliver {
    fn deliver<'a>(
        &'a self,
        deadline: &'a Deadline,
        results: &'a ResultSink,
        target: &'a TargetConfig,
        sample: HealthSample,
        session_id: &'a SessionId,
        agent_name: Option<&'a str>,
    ) -> DeliverFuture<'a> {
        Box::pin(async move {
            self.scopes.lock().unwrap().push(deadline.token().clone());
            self.calls.lock().unwrap().push(Delivered {
                budget: deadline.budget(),
                target: target.clone(),
                sample,
                session_id: session_id.clone(),
                agent_name: agent_name.map(str::to_owned),
            });

            if self.fail {
                let event = ResultEvent::with_error(
                    "failed to report health status",
                    BeaconError::Delivery("rejected".to_string()),
                );
                emit_result(results, event, deadline.token()).await;
            }
        })
    }
}

pub struct FixedIdentity(pub &'static str);

impl IdentityProvider for FixedIdentity {
    fn generate(&self) -> BeaconResult<SessionId> {
        Ok(SessionId::new(self.0))
    }
}

pub struct FailingIdentity;

impl IdentityProvider for FailingIdentity {
    fn generate(&self) -> BeaconResult<SessionId> {
        Err(BeaconError::Identity("clock unavailable".to_string()))
    }
}
