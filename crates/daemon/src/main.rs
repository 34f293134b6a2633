/// onionmsg - onion-routed anonymous messaging
///
/// One binary runs every role: the relay registry, a relay, a user, or a
/// whole local network in a single process.

use anyhow::Result;
use clap::{Parser, Subcommand};
use onionmsg_common::NetworkConfig;
use onionmsg_core::{DestinationId, RelayId};
use onionmsg_daemon::network;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onionmsg", version, about = "Onion-routed anonymous messaging")]
struct Cli {
    /// Network configuration file (TOML); defaults are used if absent
    #[arg(short, long, global = true, default_value = "onionmsg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay registry
    Registry,

    /// Run a single relay
    Relay {
        #[arg(long)]
        id: u32,
    },

    /// Run a single user endpoint
    User {
        #[arg(long)]
        id: u32,
    },

    /// Run a registry, relays and users in one process
    Network {
        #[arg(long, default_value_t = 10)]
        relays: u32,

        #[arg(long, default_value_t = 2)]
        users: u32,
    },

    /// Write the effective configuration to the config path
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    info!("onionmsg v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Registry => network::run_registry(&config).await,
        Command::Relay { id } => network::run_relay(&config, RelayId::new(id)).await,
        Command::User { id } => network::run_user(&config, DestinationId::new(id)).await,
        Command::Network { relays, users } => {
            tokio::select! {
                result = network::run_local_network(&config, relays, users) => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    Ok(())
                }
            }
        }
        Command::Config => {
            config.to_file(&cli.config)?;
            info!("Saved configuration to {:?}", cli.config);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<NetworkConfig> {
    if path.exists() {
        info!("Loading configuration from {:?}", path);
        Ok(NetworkConfig::from_file(path)?)
    } else {
        info!("No configuration file found, using defaults");
        Ok(NetworkConfig::default())
    }
}
