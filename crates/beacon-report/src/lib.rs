//! beacon-report — delivery of health samples to the management plane.
//!
//! A [`Deliver`] implementation sends one sample per call. Failures never
//! come back to the caller: they are pushed into the session's
//! [`ResultSink`] as a [`ResultEvent`](beacon_core::ResultEvent).

pub mod management;

pub use management::{ManagementClient, StatusReport};

use std::future::Future;
use std::pin::Pin;

use beacon_core::{Deadline, HealthSample, ResultSink, SessionId, TargetConfig};

/// Boxed future returned by [`Deliver::deliver`].
pub type DeliverFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Delivers one sample, tagged with the session identity and agent name.
pub trait Deliver: Send + Sync {
    fn deliver<'a>(
        &'a self,
        deadline: &'a Deadline,
        results: &'a ResultSink,
        target: &'a TargetConfig,
        sample: HealthSample,
        session_id: &'a SessionId,
        agent_name: Option<&'a str>,
    ) -> DeliverFuture<'a>;
}
