//! Beacon daemon — runs a discovery client or a beacon over UDP.

mod config;
mod delegate;
mod shutdown;

use std::path::PathBuf;
use std::rc::Rc;

use beacon_network::{driver, Clock, DiscoveryClient, DiscoveryServer, SystemClock, UdpTransportFactory};
use beacon_types::Endpoint;
use beacon_utils::{init_logging, LogFormat};
use clap::Parser;
use tokio::sync::watch;

use config::{ConfigError, DaemonConfig, Role};
use delegate::LoggingDelegate;

#[derive(Parser)]
#[command(name = "beacon-daemon", about = "Peer discovery daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run as a discovery client or as a beacon.
    #[arg(long, value_enum, env = "BEACON_ROLE")]
    role: Option<Role>,

    /// Local UDP endpoint to bind, e.g. "0.0.0.0:8002".
    #[arg(long, env = "BEACON_LOCAL_ADDR")]
    local_addr: Option<Endpoint>,

    /// Beacon to bootstrap from (client role).
    #[arg(long, env = "BEACON_ADDR")]
    beacon: Option<Endpoint>,

    /// Accept inbound discovery connections and heartbeat the beacon.
    #[arg(long, env = "BEACON_DISCOVERABLE")]
    discoverable: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BEACON_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BEACON_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Merge CLI overrides onto the file config (or defaults).
    fn resolve(self) -> Result<DaemonConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(role) = self.role {
            config.role = role;
        }
        if let Some(local_addr) = self.local_addr {
            config.local_addr = local_addr;
        }
        if let Some(beacon) = self.beacon {
            config.beacon_addr = Some(beacon);
        }
        config.discovery.discoverable |= self.discoverable;
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let config = Cli::parse().resolve()?;
    init_logging(config.log_format, &config.log_level);

    // The discovery layer is single-threaded by construction.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown::wait_for_signal(shutdown_tx));

    let clock: Rc<dyn Clock> = Rc::new(SystemClock::new());

    match config.role {
        Role::Client => {
            let beacon = config.beacon_addr.ok_or(ConfigError::MissingBeacon)?;
            tracing::info!(
                local = %config.local_addr,
                %beacon,
                discoverable = config.discovery.discoverable,
                "starting discovery client"
            );
            let mut client = DiscoveryClient::new(
                config.local_addr,
                UdpTransportFactory::new(),
                LoggingDelegate::new(config.protocols),
                clock,
                config.discovery,
            )?;
            client.start_discovery(beacon);
            driver::run(&mut client, shutdown_rx).await?;
            tracing::info!(known = client.delegate().known(), "discovery client exited");
        }
        Role::Beacon => {
            tracing::info!(local = %config.local_addr, "starting beacon");
            let mut server = DiscoveryServer::new(
                config.local_addr,
                UdpTransportFactory::new(),
                config.protocols,
                clock,
                config.beacon,
            )?;
            driver::run(&mut server, shutdown_rx).await?;
            tracing::info!(peers = server.peer_count(), "beacon exited");
        }
    }

    Ok(())
}
