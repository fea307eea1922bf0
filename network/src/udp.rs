//! UDP transport factory backed by a single tokio socket.
//!
//! Every remote endpoint gets at most one transport. Datagrams are framed by
//! UDP itself, so one datagram is one frame. There is no connection
//! handshake: a dial completes as soon as it is registered, and the first
//! datagram from an unknown remote is offered to the listen delegate.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{SocketAddr, UdpSocket as StdUdpSocket};
use std::sync::Arc;

use beacon_types::{Endpoint, TransportId};
use tokio::net::UdpSocket;

use crate::transport::{TransportEvent, TransportFactory};
use crate::NetworkError;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

#[derive(Debug)]
struct UdpTransport {
    remote: Endpoint,
    /// Whether a delegate has been attached to this transport.
    attached: bool,
}

#[derive(Debug, Default)]
pub struct UdpTransportFactory {
    /// Receive side, registered with the tokio reactor.
    socket: Option<Arc<UdpSocket>>,
    /// Non-blocking duplicate of the same socket used for sends, so a send
    /// never waits on reactor readiness.
    send_socket: Option<StdUdpSocket>,
    local: Option<Endpoint>,
    listening: bool,
    transports: HashMap<TransportId, UdpTransport>,
    by_remote: HashMap<Endpoint, TransportId>,
    next_id: u64,
    events: VecDeque<TransportEvent>,
}

impl UdpTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound socket, for the driver to receive on.
    pub fn socket(&self) -> Option<Arc<UdpSocket>> {
        self.socket.clone()
    }

    /// Actual bound endpoint (resolves port `0`).
    pub fn local_addr(&self) -> Option<Endpoint> {
        self.local
    }

    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }

    /// Feed one datagram received from `from`.
    pub fn ingest(&mut self, packet: Vec<u8>, from: SocketAddr) {
        let SocketAddr::V4(from) = from else {
            tracing::debug!(peer = %from, "ignoring non-IPv4 datagram");
            return;
        };
        let remote = Endpoint::from(from);

        if let Some(&transport) = self.by_remote.get(&remote) {
            self.events
                .push_back(TransportEvent::Received { transport, packet });
        } else if self.listening {
            self.events
                .push_back(TransportEvent::Incoming { remote, packet });
        } else {
            tracing::trace!(peer = %remote, "not listening, dropping datagram");
        }
    }

    fn register(&mut self, remote: Endpoint, attached: bool) -> TransportId {
        if let Some(&id) = self.by_remote.get(&remote) {
            if attached {
                if let Some(t) = self.transports.get_mut(&id) {
                    t.attached = true;
                }
            }
            return id;
        }
        let id = TransportId::new(self.next_id);
        self.next_id += 1;
        self.transports.insert(id, UdpTransport { remote, attached });
        self.by_remote.insert(remote, id);
        id
    }

    fn is_attached(&self, transport: TransportId) -> bool {
        self.transports.get(&transport).is_some_and(|t| t.attached)
    }
}

impl TransportFactory for UdpTransportFactory {
    /// Must be called from within a tokio runtime.
    fn bind(&mut self, local: Endpoint) -> Result<(), NetworkError> {
        if let Some(bound) = self.local {
            return Err(NetworkError::AlreadyBound(bound));
        }
        let std_socket = StdUdpSocket::bind(local.as_socket_addr())?;
        std_socket.set_nonblocking(true)?;
        let send_socket = std_socket.try_clone()?;
        let socket = UdpSocket::from_std(std_socket)?;
        let bound = match socket.local_addr()? {
            SocketAddr::V4(addr) => Endpoint::from(addr),
            SocketAddr::V6(_) => local,
        };
        self.socket = Some(Arc::new(socket));
        self.send_socket = Some(send_socket);
        self.local = Some(bound);
        Ok(())
    }

    fn listen(&mut self) -> Result<(), NetworkError> {
        if self.socket.is_none() {
            return Err(NetworkError::NotBound);
        }
        self.listening = true;
        Ok(())
    }

    fn dial(&mut self, remote: Endpoint) {
        let transport = self.register(remote, true);
        self.events.push_back(TransportEvent::Dialed(transport));
    }

    fn accept(&mut self, remote: Endpoint, packet: Vec<u8>) -> TransportId {
        let transport = self.register(remote, false);
        self.events
            .push_back(TransportEvent::Received { transport, packet });
        transport
    }

    fn setup(&mut self, transport: TransportId) {
        if let Some(t) = self.transports.get_mut(&transport) {
            t.attached = true;
        }
    }

    fn send(&mut self, transport: TransportId, packet: Vec<u8>) -> Result<(), NetworkError> {
        let remote = self
            .transports
            .get(&transport)
            .map(|t| t.remote)
            .ok_or(NetworkError::TransportNotFound(transport))?;
        let socket = self.send_socket.as_ref().ok_or(NetworkError::NotBound)?;

        match socket.send_to(&packet, remote.as_socket_addr()) {
            Ok(_) => {
                self.events
                    .push_back(TransportEvent::Sent { transport, packet });
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tracing::debug!(peer = %remote, "socket busy, dropping datagram");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self, transport: TransportId) {
        if let Some(t) = self.transports.remove(&transport) {
            self.by_remote.remove(&t.remote);
            tracing::trace!(%transport, peer = %t.remote, "transport closed");
        }
    }

    fn remote_addr(&self, transport: TransportId) -> Option<Endpoint> {
        self.transports.get(&transport).map(|t| t.remote)
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        while let Some(event) = self.events.pop_front() {
            match &event {
                TransportEvent::Received { transport, .. } if !self.is_attached(*transport) => {
                    tracing::trace!(%transport, "no delegate attached, dropping frame");
                }
                _ => return Some(event),
            }
        }
        None
    }
}
