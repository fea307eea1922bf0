//! Peer-discovery layer of the overlay network.
//!
//! A node bootstraps by dialing one known beacon, periodically asks it for
//! its peer list, and dials every peer it learns about to exchange protocol
//! descriptors. Discoverable nodes additionally heartbeat the beacon so that
//! it advertises them to others.
//!
//! Everything here runs on a single event-loop thread: transports surface
//! [`TransportEvent`]s, timers are polled against an injected [`Clock`], and
//! the [`driver`] ties both to a tokio UDP socket.

pub mod client;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod server;
pub mod timer;
pub mod transport;
pub mod udp;

pub use client::{DiscoveryClient, DiscoveryDelegate};
pub use clock::{Clock, SystemClock};
pub use config::{BeaconConfig, DiscoveryConfig};
pub use error::NetworkError;
pub use server::DiscoveryServer;
pub use timer::Timer;
pub use transport::{
    dispatch, process_events, DiscoveryNode, ListenDelegate, TransportDelegate, TransportEvent,
    TransportFactory,
};
pub use udp::UdpTransportFactory;
