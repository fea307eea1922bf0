//! Peer endpoint (IPv4 address + port) and its fixed 8-byte wire form.
//!
//! Wire layout, shared by every frame that carries an endpoint:
//!
//! | bytes | field                                  |
//! |-------|----------------------------------------|
//! | 0-1   | address family tag, `0x0002` (IPv4), BE |
//! | 2-3   | port, big-endian                       |
//! | 4-7   | IPv4 octets                            |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use crate::TypesError;

/// A network endpoint identifying a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(SocketAddrV4);

impl Endpoint {
    /// Size of the wire encoding in bytes.
    pub const WIRE_SIZE: usize = 8;

    /// Family tag written in bytes 0-1 of the wire form.
    pub const FAMILY_IPV4: u16 = 0x0002;

    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self(SocketAddrV4::new(ip, port))
    }

    pub fn ip(&self) -> Ipv4Addr {
        *self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    /// Same address, different port.
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.ip(), port)
    }

    pub fn as_socket_addr(&self) -> SocketAddrV4 {
        self.0
    }

    /// Encode to the 8-byte wire form.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..2].copy_from_slice(&Self::FAMILY_IPV4.to_be_bytes());
        out[2..4].copy_from_slice(&self.port().to_be_bytes());
        out[4..8].copy_from_slice(&self.ip().octets());
        out
    }

    /// Decode from the first 8 bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(TypesError::ShortBuffer {
                expected: Self::WIRE_SIZE,
                actual: bytes.len(),
            });
        }
        let family = u16::from_be_bytes([bytes[0], bytes[1]]);
        if family != Self::FAMILY_IPV4 {
            return Err(TypesError::UnsupportedFamily(family));
        }
        let port = u16::from_be_bytes([bytes[2], bytes[3]]);
        let ip = Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]);
        Ok(Self::new(ip, port))
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self(addr)
    }
}

impl From<Endpoint> for SocketAddrV4 {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Endpoint {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SocketAddrV4>()
            .map(Self)
            .map_err(|e| TypesError::InvalidEndpoint(format!("{s}: {e}")))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}
