//! Beacon-side peer registry.
//!
//! A [`DiscoveryServer`] is what a [`DiscoveryClient`](crate::DiscoveryClient)
//! dials as its beacon. Discoverable clients register by heartbeating; every
//! DISCPEER is answered with the currently live registrations. Registrations
//! that stop heartbeating are pruned.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use beacon_protocol::{opcode_of, Frame, Opcode};
use beacon_types::{Endpoint, ProtocolDescriptor, TransportId};

use crate::transport::{DiscoveryNode, ListenDelegate, TransportDelegate, TransportFactory};
use crate::config::repeat_interval;
use crate::{process_events, BeaconConfig, Clock, NetworkError, Timer};

/// Registration of one discoverable peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerEntry {
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
}

pub struct DiscoveryServer<F> {
    factory: F,
    clock: Rc<dyn Clock>,
    config: BeaconConfig,
    protocols: Vec<ProtocolDescriptor>,
    /// Keyed by the endpoint heartbeats arrive from. Ordered so LISTPEER
    /// replies are deterministic.
    peers: BTreeMap<Endpoint, PeerEntry>,
    /// Last time each open transport created, dialed or received anything.
    activity: HashMap<TransportId, u64>,
    prune_timer: Timer<()>,
}

impl<F: TransportFactory> DiscoveryServer<F> {
    /// Bind `factory` to `local`, accept inbound connections and start the
    /// prune timer.
    pub fn new(
        local: Endpoint,
        mut factory: F,
        protocols: Vec<ProtocolDescriptor>,
        clock: Rc<dyn Clock>,
        config: BeaconConfig,
    ) -> Result<Self, NetworkError> {
        factory.bind(local)?;
        factory.listen()?;

        let mut prune_timer = Timer::new(clock.clone(), ());
        let interval = repeat_interval(config.prune_interval_ms);
        prune_timer.start(interval, interval);
        tracing::info!(addr = %local, "beacon listening");

        Ok(Self {
            factory,
            clock,
            config,
            protocols,
            peers: BTreeMap::new(),
            activity: HashMap::new(),
            prune_timer,
        })
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    /// Number of registered peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn peer(&self, endpoint: &Endpoint) -> Option<&PeerEntry> {
        self.peers.get(endpoint)
    }

    /// Registered endpoints in registry order.
    pub fn peers(&self) -> Vec<Endpoint> {
        self.peers.keys().copied().collect()
    }

    /// Number of transports the beacon still holds open.
    pub fn open_transports(&self) -> usize {
        self.activity.len()
    }

    /// Forget peers not heard from within `peer_timeout_ms` and close every
    /// transport idle for as long. Returns the endpoints removed from the
    /// registry.
    pub fn prune(&mut self) -> Vec<Endpoint> {
        let now = self.clock.now_ms();
        let timeout = self.config.peer_timeout_ms;
        let stale: Vec<Endpoint> = self
            .peers
            .iter()
            .filter(|(_, e)| now.saturating_sub(e.last_seen_ms) > timeout)
            .map(|(ep, _)| *ep)
            .collect();
        for ep in &stale {
            self.peers.remove(ep);
            tracing::debug!(peer = %ep, "pruned stale peer");
        }

        let idle: Vec<TransportId> = self
            .activity
            .iter()
            .filter(|(_, last)| now.saturating_sub(**last) > timeout)
            .map(|(t, _)| *t)
            .collect();
        for transport in idle {
            self.activity.remove(&transport);
            self.factory.close(transport);
        }
        stale
    }

    fn touch(&mut self, transport: TransportId) {
        self.activity.insert(transport, self.clock.now_ms());
    }

    pub fn process_events(&mut self) -> usize {
        process_events(self)
    }

    fn send_frame(&mut self, transport: TransportId, frame: &Frame) {
        match frame.encode() {
            Ok(packet) => {
                if let Err(e) = self.factory.send(transport, packet) {
                    tracing::warn!(%transport, frame = frame.name(), error = %e, "send failed");
                }
            }
            Err(e) => {
                tracing::error!(%transport, frame = frame.name(), error = %e, "cannot encode frame");
            }
        }
    }

    fn did_recv_disc_peer(&mut self, transport: TransportId, requester: Endpoint) {
        tracing::debug!(peer = %requester, "DISCPEER <<<");
        let list: Vec<Endpoint> = self
            .peers
            .keys()
            .filter(|ep| **ep != requester)
            .take(self.config.max_peers_per_list)
            .copied()
            .collect();
        self.send_frame(transport, &Frame::ListPeer(list));
    }

    fn did_recv_heartbeat(&mut self, sender: Endpoint) {
        let now = self.clock.now_ms();
        let entry = self.peers.entry(sender).or_insert_with(|| {
            tracing::info!(peer = %sender, "registered peer");
            PeerEntry {
                first_seen_ms: now,
                last_seen_ms: now,
            }
        });
        entry.last_seen_ms = now;
        tracing::trace!(peer = %sender, "HEARTBEAT <<<");
    }
}

impl<F: TransportFactory> ListenDelegate for DiscoveryServer<F> {
    fn should_accept(&self, _remote: &Endpoint) -> bool {
        true
    }

    fn did_create_transport(&mut self, transport: TransportId) {
        self.factory.setup(transport);
        self.touch(transport);
    }
}

impl<F: TransportFactory> TransportDelegate for DiscoveryServer<F> {
    fn did_dial(&mut self, transport: TransportId) {
        // Beacons never dial; a completion here is just another peer.
        self.touch(transport);
        self.send_frame(transport, &Frame::DiscProto);
    }

    fn did_recv_packet(&mut self, transport: TransportId, packet: Vec<u8>) {
        let Some(sender) = self.factory.remote_addr(transport) else {
            tracing::warn!(%transport, "frame on unknown transport");
            self.activity.remove(&transport);
            return;
        };
        self.touch(transport);
        let frame = match Frame::decode(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(peer = %sender, error = %e, "dropping malformed frame");
                return;
            }
        };

        match frame {
            Frame::DiscProto => {
                tracing::debug!(peer = %sender, "DISCPROTO <<<");
                let protocols = self.protocols.clone();
                self.send_frame(transport, &Frame::ListProto(protocols));
            }
            Frame::DiscPeer => self.did_recv_disc_peer(transport, sender),
            Frame::Heartbeat => self.did_recv_heartbeat(sender),
            Frame::ListProto(_) | Frame::ListPeer(_) => {
                tracing::error!(peer = %sender, frame = frame.name(), "unexpected frame at beacon");
            }
            Frame::Unknown(op) => {
                tracing::trace!(peer = %sender, opcode = op, "UNKNOWN <<<");
            }
        }
    }

    fn did_send_packet(&mut self, transport: TransportId, packet: Vec<u8>) {
        let name = opcode_of(&packet).map_or("UNKNOWN", Opcode::name_of);
        tracing::trace!(%transport, frame = name, ">>>");
    }
}

impl<F: TransportFactory> DiscoveryNode for DiscoveryServer<F> {
    type Factory = F;

    fn factory(&self) -> &F {
        &self.factory
    }

    fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    fn poll_timers(&mut self) {
        if self.prune_timer.poll().is_some() {
            self.prune();
        }
    }

    fn next_timeout_ms(&self) -> Option<u64> {
        self.prune_timer.remaining_ms()
    }
}
