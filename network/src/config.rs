//! Discovery timing and beacon registry configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`DiscoveryClient`](crate::DiscoveryClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Accept inbound discovery connections and heartbeat the beacon.
    #[serde(default)]
    pub discoverable: bool,

    /// How often the beacon is asked for its peer list.
    #[serde(default = "default_rediscovery_interval_ms")]
    pub rediscovery_interval_ms: u64,

    /// How often a discoverable node heartbeats its beacon.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

/// Settings for a [`DiscoveryServer`](crate::DiscoveryServer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// How often stale peers are pruned.
    #[serde(default = "default_prune_interval_ms")]
    pub prune_interval_ms: u64,

    /// A peer not heard from for this long is forgotten.
    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,

    /// Upper bound on entries in one LISTPEER reply.
    #[serde(default = "default_max_peers_per_list")]
    pub max_peers_per_list: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rediscovery_interval_ms() -> u64 {
    60_000
}

fn default_heartbeat_interval_ms() -> u64 {
    10_000
}

fn default_prune_interval_ms() -> u64 {
    10_000
}

fn default_peer_timeout_ms() -> u64 {
    60_000
}

fn default_max_peers_per_list() -> usize {
    128
}

/// Interval for a timer that must keep repeating. A repeat of `0` would
/// make the timer one-shot, so `0` is raised to 1 ms.
pub(crate) fn repeat_interval(interval_ms: u64) -> u64 {
    interval_ms.max(1)
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            discoverable: false,
            rediscovery_interval_ms: default_rediscovery_interval_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            prune_interval_ms: default_prune_interval_ms(),
            peer_timeout_ms: default_peer_timeout_ms(),
            max_peers_per_list: default_max_peers_per_list(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_defaults() {
        let cfg = DiscoveryConfig::default();
        assert!(!cfg.discoverable);
        assert_eq!(cfg.rediscovery_interval_ms, 60_000);
        assert_eq!(cfg.heartbeat_interval_ms, 10_000);
    }

    #[test]
    fn beacon_defaults() {
        let cfg = BeaconConfig::default();
        assert_eq!(cfg.prune_interval_ms, 10_000);
        assert_eq!(cfg.peer_timeout_ms, 60_000);
        assert_eq!(cfg.max_peers_per_list, 128);
    }

    #[test]
    fn zero_repeat_interval_is_raised() {
        assert_eq!(repeat_interval(0), 1);
        assert_eq!(repeat_interval(250), 250);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: DiscoveryConfig = toml::from_str("discoverable = true").unwrap();
        assert!(cfg.discoverable);
        assert_eq!(cfg.heartbeat_interval_ms, 10_000);

        let cfg: BeaconConfig = toml::from_str("peer_timeout_ms = 5000").unwrap();
        assert_eq!(cfg.peer_timeout_ms, 5_000);
        assert_eq!(cfg.max_peers_per_list, 128);
    }
}
