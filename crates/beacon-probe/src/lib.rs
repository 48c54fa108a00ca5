//! beacon-probe — health probing for the Beacon agent.
//!
//! A [`Probe`] performs one observation of the inference server and
//! returns it as a [`HealthSample`](beacon_core::HealthSample). The
//! caller owns what happens next; probes never push into channels.

pub mod llamacpp;

pub use llamacpp::LlamaCppProbe;

use std::future::Future;
use std::pin::Pin;

use beacon_core::{BeaconResult, Deadline, HealthSample};

/// Boxed future returned by [`Probe::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = BeaconResult<HealthSample>> + Send + 'a>>;

/// One health observation, bounded by the caller's deadline.
pub trait Probe: Send + Sync {
    fn probe<'a>(&'a self, deadline: &'a Deadline) -> ProbeFuture<'a>;
}
