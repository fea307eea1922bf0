//! Transport-layer contract consumed by discovery nodes.
//!
//! A [`TransportFactory`] owns every transport and hands out [`TransportId`]
//! handles. Instead of calling back into its delegate, it queues
//! [`TransportEvent`]s that the owning node drains with [`process_events`];
//! [`dispatch`] routes each event to the node's [`ListenDelegate`] and
//! [`TransportDelegate`] methods.

use beacon_types::{Endpoint, TransportId};

use crate::NetworkError;

/// Something the transport layer wants its delegate to know about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// A datagram from a remote with no transport yet.
    Incoming { remote: Endpoint, packet: Vec<u8> },
    /// An outbound dial completed.
    Dialed(TransportId),
    /// A frame arrived on an established transport.
    Received {
        transport: TransportId,
        packet: Vec<u8>,
    },
    /// A previously queued send went out.
    Sent {
        transport: TransportId,
        packet: Vec<u8>,
    },
}

pub trait TransportFactory {
    /// Reserve the local endpoint for passive accept.
    fn bind(&mut self, local: Endpoint) -> Result<(), NetworkError>;

    /// Start surfacing [`TransportEvent::Incoming`] for unknown remotes.
    fn listen(&mut self) -> Result<(), NetworkError>;

    /// Begin establishing an outbound transport. Completion is reported as
    /// [`TransportEvent::Dialed`]; there is no failure event.
    fn dial(&mut self, remote: Endpoint);

    /// Create a transport for an accepted inbound remote. `packet` is the
    /// datagram that triggered the accept and is redelivered as
    /// [`TransportEvent::Received`] once the transport is set up.
    fn accept(&mut self, remote: Endpoint, packet: Vec<u8>) -> TransportId;

    /// Attach the caller as delegate of `transport`. Received frames are
    /// only delivered for attached transports.
    fn setup(&mut self, transport: TransportId);

    /// Queue `packet` on `transport`. Completion is reported as
    /// [`TransportEvent::Sent`].
    fn send(&mut self, transport: TransportId, packet: Vec<u8>) -> Result<(), NetworkError>;

    /// Tear `transport` down and forget its remote. Unknown ids are ignored.
    fn close(&mut self, transport: TransportId);

    /// Remote endpoint of `transport`, `None` when it no longer exists.
    fn remote_addr(&self, transport: TransportId) -> Option<Endpoint>;

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

pub trait ListenDelegate {
    fn should_accept(&self, remote: &Endpoint) -> bool;
    fn did_create_transport(&mut self, transport: TransportId);
}

pub trait TransportDelegate {
    fn did_dial(&mut self, transport: TransportId);
    fn did_recv_packet(&mut self, transport: TransportId, packet: Vec<u8>);
    fn did_send_packet(&mut self, transport: TransportId, packet: Vec<u8>);
}

/// A protocol endpoint driven by one event loop: it owns its factory and
/// its timers and reacts to both.
pub trait DiscoveryNode: ListenDelegate + TransportDelegate {
    type Factory: TransportFactory;

    fn factory(&self) -> &Self::Factory;
    fn factory_mut(&mut self) -> &mut Self::Factory;

    /// Run the handler of every timer that is due.
    fn poll_timers(&mut self);

    /// Milliseconds until the earliest scheduled timer.
    fn next_timeout_ms(&self) -> Option<u64>;
}

/// Route one transport event to `node`.
pub fn dispatch<N: DiscoveryNode>(node: &mut N, event: TransportEvent) {
    match event {
        TransportEvent::Incoming { remote, packet } => {
            if !node.should_accept(&remote) {
                tracing::debug!(peer = %remote, "rejecting inbound transport");
                return;
            }
            let transport = node.factory_mut().accept(remote, packet);
            node.did_create_transport(transport);
        }
        TransportEvent::Dialed(transport) => node.did_dial(transport),
        TransportEvent::Received { transport, packet } => node.did_recv_packet(transport, packet),
        TransportEvent::Sent { transport, packet } => node.did_send_packet(transport, packet),
    }
}

/// Drain every pending event from the node's factory. Returns the number of
/// events dispatched.
pub fn process_events<N: DiscoveryNode>(node: &mut N) -> usize {
    let mut count = 0;
    while let Some(event) = node.factory_mut().poll_event() {
        dispatch(node, event);
        count += 1;
    }
    count
}
