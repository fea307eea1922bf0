//! Daemon configuration with TOML file support.

use std::path::Path;

use beacon_network::{BeaconConfig, DiscoveryConfig};
use beacon_types::{Endpoint, ProtocolDescriptor, MAX_DESCRIPTORS};
use beacon_utils::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("client role requires a beacon address")]
    MissingBeacon,

    #[error("{0} protocols configured, at most 255 can be advertised")]
    TooManyProtocols(usize),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// Which side of the discovery protocol this daemon runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Bootstrap through a beacon and discover peers.
    #[default]
    Client,
    /// Serve as a beacon for other nodes.
    Beacon,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub role: Role,

    /// Local UDP endpoint to bind.
    #[serde(default = "default_local_addr")]
    pub local_addr: Endpoint,

    /// Beacon to bootstrap from (client role).
    #[serde(default)]
    pub beacon_addr: Option<Endpoint>,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub beacon: BeaconConfig,

    /// Protocols advertised in LISTPROTO replies.
    #[serde(default)]
    pub protocols: Vec<ProtocolDescriptor>,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_local_addr() -> Endpoint {
    Endpoint::new(std::net::Ipv4Addr::UNSPECIFIED, 8002)
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.role == Role::Client && self.beacon_addr.is_none() {
            return Err(ConfigError::MissingBeacon);
        }
        if self.protocols.len() > MAX_DESCRIPTORS {
            return Err(ConfigError::TooManyProtocols(self.protocols.len()));
        }
        let intervals = [
            ("discovery.rediscovery_interval_ms", self.discovery.rediscovery_interval_ms),
            ("discovery.heartbeat_interval_ms", self.discovery.heartbeat_interval_ms),
            ("beacon.prune_interval_ms", self.beacon.prune_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ZeroInterval(*name));
        }
        Ok(())
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            role: Role::default(),
            local_addr: default_local_addr(),
            beacon_addr: None,
            discovery: DiscoveryConfig::default(),
            beacon: BeaconConfig::default(),
            protocols: Vec::new(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}
