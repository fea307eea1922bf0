//! Nullable transport factory — record traffic without sending it.

use std::collections::{HashMap, VecDeque};

use beacon_network::{NetworkError, TransportEvent, TransportFactory};
use beacon_protocol::Frame;
use beacon_types::{Endpoint, TransportId};

#[derive(Debug)]
struct NullTransport {
    remote: Endpoint,
    attached: bool,
}

/// A test transport factory.
///
/// Dials are only recorded; the test decides when (and whether) a dial
/// completes via [`complete_dial`](Self::complete_dial). Sends are recorded
/// and acknowledged with a `Sent` event, like a real transport would.
#[derive(Debug, Default)]
pub struct NullTransportFactory {
    bound: Option<Endpoint>,
    listening: bool,
    dials: Vec<Endpoint>,
    sent: Vec<(TransportId, Vec<u8>)>,
    transports: HashMap<TransportId, NullTransport>,
    next_id: u64,
    events: VecDeque<TransportEvent>,
}

impl NullTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound(&self) -> Option<Endpoint> {
        self.bound
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Every `dial` call, in order.
    pub fn dials(&self) -> &[Endpoint] {
        &self.dials
    }

    /// Every packet passed to `send`, in order.
    pub fn sent(&self) -> &[(TransportId, Vec<u8>)] {
        &self.sent
    }

    /// Decoded frames sent on `transport`, in order.
    pub fn sent_frames(&self, transport: TransportId) -> Vec<Frame> {
        self.sent
            .iter()
            .filter(|(t, _)| *t == transport)
            .filter_map(|(_, p)| Frame::decode(p).ok())
            .collect()
    }

    /// Number of frames with `opcode` sent on any transport.
    pub fn count_sent(&self, opcode: u8) -> usize {
        self.sent.iter().filter(|(_, p)| p.get(1) == Some(&opcode)).count()
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// Simulate the transport layer finishing a dial to `remote`.
    pub fn complete_dial(&mut self, remote: Endpoint) -> TransportId {
        let id = self.register(remote, true);
        self.events.push_back(TransportEvent::Dialed(id));
        id
    }

    /// Simulate a datagram from a remote that has no transport yet.
    pub fn incoming(&mut self, remote: Endpoint, packet: Vec<u8>) {
        self.events
            .push_back(TransportEvent::Incoming { remote, packet });
    }

    /// Simulate a frame arriving on an existing transport.
    pub fn deliver(&mut self, transport: TransportId, packet: Vec<u8>) {
        self.events
            .push_back(TransportEvent::Received { transport, packet });
    }

    /// Encode `frame` and deliver it on `transport`.
    pub fn deliver_frame(&mut self, transport: TransportId, frame: &Frame) {
        let packet = frame.encode().expect("test frame must encode");
        self.deliver(transport, packet);
    }

    pub fn is_attached(&self, transport: TransportId) -> bool {
        self.transports.get(&transport).is_some_and(|t| t.attached)
    }

    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }

    fn register(&mut self, remote: Endpoint, attached: bool) -> TransportId {
        let id = TransportId::new(self.next_id);
        self.next_id += 1;
        self.transports.insert(id, NullTransport { remote, attached });
        id
    }
}

impl TransportFactory for NullTransportFactory {
    fn bind(&mut self, local: Endpoint) -> Result<(), NetworkError> {
        if let Some(bound) = self.bound {
            return Err(NetworkError::AlreadyBound(bound));
        }
        self.bound = Some(local);
        Ok(())
    }

    fn listen(&mut self) -> Result<(), NetworkError> {
        if self.bound.is_none() {
            return Err(NetworkError::NotBound);
        }
        self.listening = true;
        Ok(())
    }

    fn dial(&mut self, remote: Endpoint) {
        self.dials.push(remote);
    }

    fn accept(&mut self, remote: Endpoint, packet: Vec<u8>) -> TransportId {
        let id = self.register(remote, false);
        self.events.push_back(TransportEvent::Received {
            transport: id,
            packet,
        });
        id
    }

    fn setup(&mut self, transport: TransportId) {
        if let Some(t) = self.transports.get_mut(&transport) {
            t.attached = true;
        }
    }

    fn send(&mut self, transport: TransportId, packet: Vec<u8>) -> Result<(), NetworkError> {
        if !self.transports.contains_key(&transport) {
            return Err(NetworkError::TransportNotFound(transport));
        }
        self.sent.push((transport, packet.clone()));
        self.events
            .push_back(TransportEvent::Sent { transport, packet });
        Ok(())
    }

    fn close(&mut self, transport: TransportId) {
        self.transports.remove(&transport);
    }

    fn remote_addr(&self, transport: TransportId) -> Option<Endpoint> {
        self.transports.get(&transport).map(|t| t.remote)
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        while let Some(event) = self.events.pop_front() {
            if let TransportEvent::Received { transport, .. } = &event {
                if !self.is_attached(*transport) {
                    continue;
                }
            }
            return Some(event);
        }
        None
    }
}
