//! Discovery client — bootstraps through a beacon and dials learned peers.
//!
//! The first transport whose dial completes becomes the beacon, for the
//! lifetime of the client. On assignment the client asks the beacon for its
//! peer list, starts the rediscovery timer and, if discoverable at that
//! moment, the heartbeat timer. Every later dial completion is treated as a
//! peer to query for its protocol list.

use std::rc::Rc;

use beacon_protocol::{opcode_of, Frame, Opcode};
use beacon_types::{Endpoint, ProtocolDescriptor, TransportId};

use crate::transport::{DiscoveryNode, ListenDelegate, TransportDelegate, TransportFactory};
use crate::config::repeat_interval;
use crate::{process_events, Clock, DiscoveryConfig, NetworkError, Timer};

/// Application hooks required by a [`DiscoveryClient`].
pub trait DiscoveryDelegate {
    /// Protocols this node serves, in advertisement order. At most 255
    /// entries can be encoded; a longer list is not sent.
    fn get_protocols(&self) -> Vec<ProtocolDescriptor>;

    /// A peer at `peer` serves `protocol_id` at `version`.
    fn new_peer(&mut self, peer: Endpoint, protocol_id: u32, version: u16);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DiscoveryTimer {
    Rediscover,
    Heartbeat,
}

pub struct DiscoveryClient<F, D> {
    factory: F,
    delegate: D,
    config: DiscoveryConfig,
    discoverable: bool,
    beacon: Option<TransportId>,
    rediscovery_timer: Timer<DiscoveryTimer>,
    heartbeat_timer: Timer<DiscoveryTimer>,
}

impl<F: TransportFactory, D: DiscoveryDelegate> DiscoveryClient<F, D> {
    /// Bind `factory` to `local` and start accepting inbound connections.
    pub fn new(
        local: Endpoint,
        mut factory: F,
        delegate: D,
        clock: Rc<dyn Clock>,
        config: DiscoveryConfig,
    ) -> Result<Self, NetworkError> {
        factory.bind(local)?;
        factory.listen()?;
        tracing::debug!(addr = %local, discoverable = config.discoverable, "discovery client bound");

        Ok(Self {
            factory,
            delegate,
            discoverable: config.discoverable,
            config,
            beacon: None,
            rediscovery_timer: Timer::new(clock.clone(), DiscoveryTimer::Rediscover),
            heartbeat_timer: Timer::new(clock, DiscoveryTimer::Heartbeat),
        })
    }

    /// Dial the beacon. The first completed dial becomes the beacon.
    pub fn start_discovery(&mut self, beacon_addr: Endpoint) {
        tracing::info!(beacon = %beacon_addr, "starting discovery");
        self.factory.dial(beacon_addr);
    }

    pub fn is_discoverable(&self) -> bool {
        self.discoverable
    }

    /// Change discoverability. Only inbound gating and the per-firing
    /// heartbeat check observe the change; the heartbeat timer is neither
    /// started nor stopped.
    pub fn set_discoverable(&mut self, discoverable: bool) {
        self.discoverable = discoverable;
    }

    /// The beacon transport, once assigned.
    pub fn beacon(&self) -> Option<TransportId> {
        self.beacon
    }

    pub fn is_heartbeating(&self) -> bool {
        self.heartbeat_timer.is_active()
    }

    pub fn is_rediscovering(&self) -> bool {
        self.rediscovery_timer.is_active()
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Drain and dispatch every pending transport event.
    pub fn process_events(&mut self) -> usize {
        process_events(self)
    }

    // -- Frame senders ---------------------------------------------------------

    fn send_frame(&mut self, transport: TransportId, frame: &Frame) {
        let packet = match frame.encode() {
            Ok(packet) => packet,
            Err(e) => {
                tracing::error!(%transport, frame = frame.name(), error = %e, "cannot encode frame");
                return;
            }
        };
        if let Err(e) = self.factory.send(transport, packet) {
            tracing::warn!(%transport, frame = frame.name(), error = %e, "send failed");
        }
    }

    fn send_list_proto(&mut self, transport: TransportId) {
        let protocols = self.delegate.get_protocols();
        self.send_frame(transport, &Frame::ListProto(protocols));
    }

    fn send_to_beacon(&mut self, frame: &Frame) {
        let Some(beacon) = self.beacon else {
            return;
        };
        if self.factory.remote_addr(beacon).is_none() {
            tracing::warn!(transport = %beacon, frame = frame.name(), "beacon transport is gone");
            return;
        }
        self.send_frame(beacon, frame);
    }

    // -- Frame handlers --------------------------------------------------------

    fn did_recv_list_proto(&mut self, transport: TransportId, descriptors: Vec<ProtocolDescriptor>) {
        let Some(sender) = self.factory.remote_addr(transport) else {
            tracing::warn!(%transport, "LISTPROTO on unknown transport");
            return;
        };
        tracing::debug!(peer = %sender, count = descriptors.len(), "LISTPROTO <<<");
        for d in descriptors {
            self.delegate
                .new_peer(sender.with_port(d.port), d.protocol_id, d.version);
        }
    }

    fn did_recv_list_peer(&mut self, transport: TransportId, peers: Vec<Endpoint>) {
        tracing::debug!(%transport, count = peers.len(), "LISTPEER <<<");
        for peer in peers {
            self.factory.dial(peer);
        }
    }

    fn on_timer(&mut self, timer: DiscoveryTimer) {
        match timer {
            DiscoveryTimer::Rediscover => self.send_to_beacon(&Frame::DiscPeer),
            DiscoveryTimer::Heartbeat => {
                if self.discoverable {
                    self.send_to_beacon(&Frame::Heartbeat);
                }
            }
        }
    }

    fn peer_label(&self, transport: TransportId) -> String {
        self.factory
            .remote_addr(transport)
            .map_or_else(|| transport.to_string(), |ep| ep.to_string())
    }
}

impl<F: TransportFactory, D: DiscoveryDelegate> ListenDelegate for DiscoveryClient<F, D> {
    /// Non-discoverable nodes refuse every inbound connection, whoever the
    /// remote is.
    fn should_accept(&self, _remote: &Endpoint) -> bool {
        self.discoverable
    }

    fn did_create_transport(&mut self, transport: TransportId) {
        self.factory.setup(transport);
    }
}

impl<F: TransportFactory, D: DiscoveryDelegate> TransportDelegate for DiscoveryClient<F, D> {
    fn did_dial(&mut self, transport: TransportId) {
        if self.beacon.is_some() {
            self.send_frame(transport, &Frame::DiscProto);
            return;
        }

        tracing::info!(beacon = %self.peer_label(transport), "beacon established");
        self.beacon = Some(transport);
        self.send_frame(transport, &Frame::DiscPeer);

        let interval = repeat_interval(self.config.rediscovery_interval_ms);
        self.rediscovery_timer.start(interval, interval);
        if self.discoverable {
            let interval = repeat_interval(self.config.heartbeat_interval_ms);
            self.heartbeat_timer.start(interval, interval);
        }
    }

    fn did_recv_packet(&mut self, transport: TransportId, packet: Vec<u8>) {
        let frame = match Frame::decode(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(peer = %self.peer_label(transport), error = %e, "dropping malformed frame");
                return;
            }
        };

        match frame {
            Frame::DiscProto => {
                tracing::debug!(peer = %self.peer_label(transport), "DISCPROTO <<<");
                self.send_list_proto(transport);
            }
            Frame::ListProto(descriptors) => self.did_recv_list_proto(transport, descriptors),
            Frame::DiscPeer => {
                tracing::error!(peer = %self.peer_label(transport), "unexpected DISCPEER");
            }
            Frame::ListPeer(peers) => self.did_recv_list_peer(transport, peers),
            Frame::Heartbeat => {
                tracing::error!(peer = %self.peer_label(transport), "unexpected HEARTBEAT");
            }
            Frame::Unknown(op) => {
                tracing::trace!(
                    peer = %self.peer_label(transport),
                    opcode = op,
                    payload = %hex::encode(&packet[2..]),
                    "UNKNOWN <<<"
                );
            }
        }
    }

    fn did_send_packet(&mut self, transport: TransportId, packet: Vec<u8>) {
        let name = opcode_of(&packet).map_or("UNKNOWN", Opcode::name_of);
        tracing::trace!(peer = %self.peer_label(transport), frame = name, ">>>");
    }
}

impl<F: TransportFactory, D: DiscoveryDelegate> DiscoveryNode for DiscoveryClient<F, D> {
    type Factory = F;

    fn factory(&self) -> &F {
        &self.factory
    }

    fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    fn poll_timers(&mut self) {
        if let Some(&timer) = self.rediscovery_timer.poll() {
            self.on_timer(timer);
        }
        if let Some(&timer) = self.heartbeat_timer.poll() {
            self.on_timer(timer);
        }
    }

    fn next_timeout_ms(&self) -> Option<u64> {
        [
            self.rediscovery_timer.remaining_ms(),
            self.heartbeat_timer.remaining_ms(),
        ]
        .into_iter()
        .flatten()
        .min()
    }
}
