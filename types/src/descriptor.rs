//! Application protocol descriptors advertised in LISTPROTO frames.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Maximum number of descriptors one LISTPROTO frame can carry (the count
/// field is a single byte).
pub const MAX_DESCRIPTORS: usize = 255;

/// Names an application protocol this node serves, its version, and the
/// port it is served on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolDescriptor {
    pub protocol_id: u32,
    pub version: u16,
    pub port: u16,
}

impl ProtocolDescriptor {
    /// Size of the wire encoding in bytes.
    pub const WIRE_SIZE: usize = 8;

    pub fn new(protocol_id: u32, version: u16, port: u16) -> Self {
        Self {
            protocol_id,
            version,
            port,
        }
    }

    /// Encode as 4-byte protocol id, 2-byte version, 2-byte port (all BE).
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..4].copy_from_slice(&self.protocol_id.to_be_bytes());
        out[4..6].copy_from_slice(&self.version.to_be_bytes());
        out[6..8].copy_from_slice(&self.port.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(TypesError::ShortBuffer {
                expected: Self::WIRE_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            protocol_id: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            version: u16::from_be_bytes([bytes[4], bytes[5]]),
            port: u16::from_be_bytes([bytes[6], bytes[7]]),
        })
    }
}

impl fmt::Display for ProtocolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proto {:#010x} v{} on port {}",
            self.protocol_id, self.version, self.port
        )
    }
}
