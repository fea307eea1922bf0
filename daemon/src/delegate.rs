//! Application delegate used by the daemon's client role.

use std::collections::HashSet;

use beacon_network::DiscoveryDelegate;
use beacon_types::{Endpoint, ProtocolDescriptor};

/// Advertises the configured protocols and logs every newly seen
/// `(peer, protocol, version)` once.
#[derive(Debug, Default)]
pub struct LoggingDelegate {
    protocols: Vec<ProtocolDescriptor>,
    seen: HashSet<(Endpoint, u32, u16)>,
}

impl LoggingDelegate {
    pub fn new(protocols: Vec<ProtocolDescriptor>) -> Self {
        Self {
            protocols,
            seen: HashSet::new(),
        }
    }

    /// Number of distinct peer/protocol notices so far.
    pub fn known(&self) -> usize {
        self.seen.len()
    }
}

impl DiscoveryDelegate for LoggingDelegate {
    fn get_protocols(&self) -> Vec<ProtocolDescriptor> {
        self.protocols.clone()
    }

    fn new_peer(&mut self, peer: Endpoint, protocol_id: u32, version: u16) {
        if self.seen.insert((peer, protocol_id, version)) {
            tracing::info!(
                %peer,
                protocol = %format!("{protocol_id:#010x}"),
                version,
                known = self.seen.len(),
                "discovered peer protocol"
            );
        }
    }
}
