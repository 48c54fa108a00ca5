//! beacond — the Beacon daemon.
//!
//! Runs next to an inference server, probes its health on a fixed
//! interval, and relays every observation to the management plane.
//!
//! # Usage
//!
//! ```text
//! beacond agent --config /etc/beacon/beacon.toml
//! beacond agent --local-addr 127.0.0.1:8080 --management-addr 10.0.0.1:8085 --name gpu-1
//! ```

mod agent_mode;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use beacon_core::{AgentConfig, AgentSection, BeaconConfig, LlamaCppSection, ManagementSection};

const DEFAULT_LOG_FILTER: &str =
    "info,beacond=debug,beacon_core=debug,beacon_probe=debug,beacon_report=debug,beacon_agent=debug";

#[derive(Parser)]
#[command(name = "beacond", about = "Beacon health-relay daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor a llama.cpp server and report its health to the management plane.
    Agent(AgentArgs),
}

#[derive(Debug, Args)]
struct AgentArgs {
    /// Path to a beacon.toml file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Display name attached to every report.
    #[arg(long)]
    name: Option<String>,

    /// llama.cpp address to probe (host:port).
    #[arg(long)]
    local_addr: Option<String>,

    /// Address advertised to the management plane. Defaults to --local-addr.
    #[arg(long)]
    external_addr: Option<String>,

    /// Bearer token for the llama.cpp server.
    #[arg(long)]
    api_key: Option<String>,

    /// Management plane address (host:port).
    #[arg(long)]
    management_addr: Option<String>,

    /// Probe cadence and per-call deadline, e.g. "5s" or "500ms".
    #[arg(long)]
    reporting_interval: Option<String>,
}

impl AgentArgs {
    fn overrides(&self) -> BeaconConfig {
        BeaconConfig {
            agent: AgentSection {
                name: self.name.clone(),
                reporting_interval: self.reporting_interval.clone(),
            },
            llamacpp: LlamaCppSection {
                local_addr: self.local_addr.clone(),
                external_addr: self.external_addr.clone(),
                api_key: self.api_key.clone(),
            },
            management: ManagementSection {
                addr: self.management_addr.clone(),
            },
        }
    }

    fn load(&self) -> anyhow::Result<AgentConfig> {
        let base = match &self.config {
            Some(path) => BeaconConfig::from_file(path)?,
            None => BeaconConfig::default(),
        };
        Ok(base.overlay(self.overrides()).resolve()?)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Agent(args) => {
            let config = args.load()?;
            agent_mode::run_agent(config).await
        }
    }
}
