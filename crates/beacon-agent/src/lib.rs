//! beacon-agent — the health-relay loop.
//!
//! Periodically probes the inference server and relays every sample to
//! the management plane, surfacing failures to a supervisor through a
//! result channel.
//!
//! # Architecture
//!
//! ```text
//! MonitoringSession::observe_and_report(results, shutdown)
//!   ├── IdentityProvider::generate() → SessionId (once; failure ends the session)
//!   ├── JoinSet
//!   │   └── Poller (interval tick → Probe within Deadline → HandoffSender)
//!   └── Reporter (caller's task)
//!       └── HandoffReceiver → Deliver within Deadline → ResultSink on failure
//! ```
//!
//! The handoff channel is a rendezvous: the poller waits for the reporter
//! to take each sample, so a slow management plane throttles probing.
//! Probe and report each get their own deadline equal to the reporting
//! interval.

pub mod handoff;
pub mod identity;
pub mod poller;
pub mod reporter;
pub mod session;

#[cfg(test)]
mod testing;

pub use identity::{IdentityProvider, UuidV7};
pub use poller::Poller;
pub use reporter::Reporter;
pub use session::{MonitoringSession, SessionConfig, SessionState};
