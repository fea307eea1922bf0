//! Nullable application delegate — serve fixed protocols, record peers.

use beacon_network::DiscoveryDelegate;
use beacon_types::{Endpoint, ProtocolDescriptor};

/// A discovered `(peer, protocol_id, version)` triple.
pub type PeerNotice = (Endpoint, u32, u16);

#[derive(Debug, Default)]
pub struct RecordingDelegate {
    protocols: Vec<ProtocolDescriptor>,
    peers: Vec<PeerNotice>,
}

impl RecordingDelegate {
    pub fn new(protocols: Vec<ProtocolDescriptor>) -> Self {
        Self {
            protocols,
            peers: Vec::new(),
        }
    }

    /// Change the advertised protocols.
    pub fn set_protocols(&mut self, protocols: Vec<ProtocolDescriptor>) {
        self.protocols = protocols;
    }

    /// Every `new_peer` notification, in order.
    pub fn peers(&self) -> &[PeerNotice] {
        &self.peers
    }
}

impl DiscoveryDelegate for RecordingDelegate {
    fn get_protocols(&self) -> Vec<ProtocolDescriptor> {
        self.protocols.clone()
    }

    fn new_peer(&mut self, peer: Endpoint, protocol_id: u32, version: u16) {
        self.peers.push((peer, protocol_id, version));
    }
}
