//! beacon-core — shared types for the Beacon health-relay agent.
//!
//! Holds everything the probe, report, and agent crates agree on:
//!
//! - [`HealthSample`], [`SessionId`], and [`ResultEvent`] (the data model)
//! - [`BeaconError`] (the error taxonomy)
//! - [`BeaconConfig`] / [`AgentConfig`] (TOML + CLI configuration)
//! - [`Deadline`] (a bounded, cancellable scope for one outbound call)
//! - [`transport::round_trip`] (a minimal hyper HTTP/1 client call)

pub mod config;
pub mod deadline;
pub mod duration;
pub mod error;
pub mod transport;
pub mod types;

pub use config::{
    AgentConfig, AgentSection, BeaconConfig, LlamaCppSection, ManagementSection, ServerAddr,
};
pub use deadline::Deadline;
pub use duration::parse_duration;
pub use error::{BeaconError, BeaconResult};
pub use types::*;
