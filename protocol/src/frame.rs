//! Frame encoding and decoding.
//!
//! | opcode | frame     | payload                                             |
//! |--------|-----------|-----------------------------------------------------|
//! | 0      | DISCPROTO | none                                                |
//! | 1      | LISTPROTO | 1-byte count N, then N 8-byte descriptors           |
//! | 2      | DISCPEER  | none                                                |
//! | 3      | LISTPEER  | repeated 8-byte endpoints, short remainder ignored  |
//! | 4      | HEARTBEAT | none                                                |
//!
//! Decoding is lenient about truncated lists: every fully-formed entry is
//! returned and a trailing partial entry is dropped.

use beacon_types::{Endpoint, ProtocolDescriptor, MAX_DESCRIPTORS};

use crate::{Opcode, ProtocolError};

/// Reserved byte + opcode byte.
pub const HEADER_SIZE: usize = 2;

/// A decoded discovery frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    DiscProto,
    ListProto(Vec<ProtocolDescriptor>),
    DiscPeer,
    ListPeer(Vec<Endpoint>),
    Heartbeat,
    /// An opcode this version does not understand. Carries the raw byte.
    Unknown(u8),
}

impl Frame {
    /// Opcode byte this frame is sent with.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::DiscProto => Opcode::DiscProto.as_byte(),
            Self::ListProto(_) => Opcode::ListProto.as_byte(),
            Self::DiscPeer => Opcode::DiscPeer.as_byte(),
            Self::ListPeer(_) => Opcode::ListPeer.as_byte(),
            Self::Heartbeat => Opcode::Heartbeat.as_byte(),
            Self::Unknown(op) => *op,
        }
    }

    pub fn name(&self) -> &'static str {
        Opcode::name_of(self.opcode())
    }

    /// Serialize the frame for transmission.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = vec![0u8, self.opcode()];
        match self {
            Self::ListProto(descriptors) => {
                if descriptors.len() > MAX_DESCRIPTORS {
                    return Err(ProtocolError::TooManyDescriptors {
                        count: descriptors.len(),
                        max: MAX_DESCRIPTORS,
                    });
                }
                out.reserve(1 + descriptors.len() * ProtocolDescriptor::WIRE_SIZE);
                out.push(descriptors.len() as u8);
                for d in descriptors {
                    out.extend_from_slice(&d.to_bytes());
                }
            }
            Self::ListPeer(peers) => {
                out.reserve(peers.len() * Endpoint::WIRE_SIZE);
                for p in peers {
                    out.extend_from_slice(&p.to_bytes());
                }
            }
            Self::DiscProto | Self::DiscPeer | Self::Heartbeat | Self::Unknown(_) => {}
        }
        Ok(out)
    }

    /// Parse a received datagram.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < HEADER_SIZE {
            return Err(ProtocolError::Truncated(data.len()));
        }
        if data[0] != 0 {
            return Err(ProtocolError::ReservedByte(data[0]));
        }
        let payload = &data[HEADER_SIZE..];

        let frame = match Opcode::from_byte(data[1]) {
            Some(Opcode::DiscProto) => Self::DiscProto,
            Some(Opcode::ListProto) => Self::ListProto(decode_descriptors(payload)),
            Some(Opcode::DiscPeer) => Self::DiscPeer,
            Some(Opcode::ListPeer) => Self::ListPeer(decode_endpoints(payload)),
            Some(Opcode::Heartbeat) => Self::Heartbeat,
            None => Self::Unknown(data[1]),
        };
        Ok(frame)
    }
}

fn decode_descriptors(payload: &[u8]) -> Vec<ProtocolDescriptor> {
    let Some((&count, body)) = payload.split_first() else {
        return Vec::new();
    };
    let available = body.len() / ProtocolDescriptor::WIRE_SIZE;
    if available < count as usize {
        tracing::debug!(
            announced = count,
            available,
            "LISTPROTO shorter than its count"
        );
    }
    body.chunks_exact(ProtocolDescriptor::WIRE_SIZE)
        .take(count as usize)
        .filter_map(|chunk| ProtocolDescriptor::from_bytes(chunk).ok())
        .collect()
}

fn decode_endpoints(payload: &[u8]) -> Vec<Endpoint> {
    payload
        .chunks_exact(Endpoint::WIRE_SIZE)
        .filter_map(|chunk| match Endpoint::from_bytes(chunk) {
            Ok(ep) => Some(ep),
            Err(e) => {
                tracing::debug!(error = %e, "skipping LISTPEER entry");
                None
            }
        })
        .collect()
}

/// Opcode byte of a raw frame, if it has one.
pub fn opcode_of(data: &[u8]) -> Option<u8> {
    data.get(1).copied()
}
