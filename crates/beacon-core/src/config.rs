//! beacon.toml configuration parser.
//!
//! [`BeaconConfig`] mirrors the file (every field optional so command-line
//! flags can fill gaps); [`BeaconConfig::resolve`] validates it into an
//! [`AgentConfig`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::{BeaconError, BeaconResult};
use crate::types::TargetConfig;

/// Reporting interval used when neither the file nor the flags set one.
pub const DEFAULT_REPORTING_INTERVAL: Duration = Duration::from_secs(10);

/// Longest accepted reporting interval.
pub const MAX_REPORTING_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// A `host:port` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerAddr {
    host: String,
    port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for ServerAddr {
    type Err = BeaconError;

    fn from_str(s: &str) -> BeaconResult<Self> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| BeaconError::Config(format!("address {s:?} is not host:port")))?;

        if host.is_empty() {
            return Err(BeaconError::Config(format!("address {s:?} has an empty host")));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| BeaconError::Config(format!("address {s:?} has an invalid port")))?;

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for ServerAddr {
    type Error = BeaconError;

    fn try_from(s: String) -> BeaconResult<Self> {
        s.parse()
    }
}

impl From<ServerAddr> for String {
    fn from(addr: ServerAddr) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeaconConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub llamacpp: LlamaCppSection,
    #[serde(default)]
    pub management: ManagementSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSection {
    pub name: Option<String>,
    pub reporting_interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlamaCppSection {
    pub local_addr: Option<String>,
    pub external_addr: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagementSection {
    pub addr: Option<String>,
}

/// Validated agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Display name attached to every report.
    pub name: Option<String>,
    /// Probe cadence, and the budget of every probe and report call.
    pub reporting_interval: Duration,
    /// Address the probe talks to.
    pub local_addr: ServerAddr,
    /// Address advertised to the management plane.
    pub external_addr: ServerAddr,
    pub api_key: Option<String>,
    pub management_addr: ServerAddr,
}

impl AgentConfig {
    pub fn target(&self) -> TargetConfig {
        TargetConfig {
            external_addr: self.external_addr.clone(),
        }
    }

    pub fn validate(&self) -> BeaconResult<()> {
        if self.reporting_interval.is_zero() {
            return Err(BeaconError::Config(
                "reporting_interval must be greater than zero".to_string(),
            ));
        }
        if self.reporting_interval > MAX_REPORTING_INTERVAL {
            return Err(BeaconError::Config(format!(
                "reporting_interval must be at most {MAX_REPORTING_INTERVAL:?}, got {:?}",
                self.reporting_interval
            )));
        }
        Ok(())
    }
}

impl BeaconConfig {
    pub fn from_file(path: &Path) -> BeaconResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BeaconError::Config(format!("read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> BeaconResult<Self> {
        toml::from_str(content).map_err(|e| BeaconError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> BeaconResult<String> {
        toml::to_string_pretty(self).map_err(|e| BeaconError::Config(e.to_string()))
    }

    /// Layer `other` on top of `self`; any value set in `other` wins.
    pub fn overlay(self, other: BeaconConfig) -> Self {
        Self {
            agent: AgentSection {
                name: other.agent.name.or(self.agent.name),
                reporting_interval: other
                    .agent
                    .reporting_interval
                    .or(self.agent.reporting_interval),
            },
            llamacpp: LlamaCppSection {
                local_addr: other.llamacpp.local_addr.or(self.llamacpp.local_addr),
                external_addr: other.llamacpp.external_addr.or(self.llamacpp.external_addr),
                api_key: other.llamacpp.api_key.or(self.llamacpp.api_key),
            },
            management: ManagementSection {
                addr: other.management.addr.or(self.management.addr),
            },
        }
    }

    /// Validate and convert into an [`AgentConfig`].
    pub fn resolve(&self) -> BeaconResult<AgentConfig> {
        let reporting_interval = match &self.agent.reporting_interval {
            Some(s) => parse_duration(s)?,
            None => DEFAULT_REPORTING_INTERVAL,
        };

        let local_addr: ServerAddr = required(&self.llamacpp.local_addr, "llamacpp.local_addr")?;
        let external_addr = match &self.llamacpp.external_addr {
            Some(addr) => addr.parse()?,
            None => local_addr.clone(),
        };
        let management_addr = required(&self.management.addr, "management.addr")?;

        let config = AgentConfig {
            name: self.agent.name.clone().filter(|n| !n.trim().is_empty()),
            reporting_interval,
            local_addr,
            external_addr,
            api_key: self.llamacpp.api_key.clone().filter(|k| !k.is_empty()),
            management_addr,
        };
        config.validate()?;
        Ok(config)
    }
}

fn required(value: &Option<String>, key: &str) -> BeaconResult<ServerAddr> {
    value
        .as_deref()
        .ok_or_else(|| BeaconError::Config(format!("{key} is required")))?
        .parse()
}
