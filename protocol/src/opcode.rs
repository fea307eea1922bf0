//! Discovery opcodes (byte 1 of every frame).

/// Known frame opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Request the peer's protocol list.
    DiscProto = 0,
    /// Protocol list response.
    ListProto = 1,
    /// Request the beacon's peer list.
    DiscPeer = 2,
    /// Peer list response.
    ListPeer = 3,
    /// Liveness advertisement sent to the beacon.
    Heartbeat = 4,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::DiscProto),
            1 => Some(Self::ListProto),
            2 => Some(Self::DiscPeer),
            3 => Some(Self::ListPeer),
            4 => Some(Self::Heartbeat),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DiscProto => "DISCPROTO",
            Self::ListProto => "LISTPROTO",
            Self::DiscPeer => "DISCPEER",
            Self::ListPeer => "LISTPEER",
            Self::Heartbeat => "HEARTBEAT",
        }
    }

    /// Name for an arbitrary opcode byte, `"UNKNOWN"` when unassigned.
    pub fn name_of(byte: u8) -> &'static str {
        Self::from_byte(byte).map_or("UNKNOWN", Self::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_values_match_wire_table() {
        assert_eq!(Opcode::DiscProto.as_byte(), 0);
        assert_eq!(Opcode::ListProto.as_byte(), 1);
        assert_eq!(Opcode::DiscPeer.as_byte(), 2);
        assert_eq!(Opcode::ListPeer.as_byte(), 3);
        assert_eq!(Opcode::Heartbeat.as_byte(), 4);
    }

    #[test]
    fn from_byte_inverts_as_byte() {
        for b in 0u8..=4 {
            assert_eq!(Opcode::from_byte(b).map(Opcode::as_byte), Some(b));
        }
    }

    #[test]
    fn unassigned_bytes_are_unknown() {
        assert_eq!(Opcode::from_byte(5), None);
        assert_eq!(Opcode::from_byte(255), None);
        assert_eq!(Opcode::name_of(255), "UNKNOWN");
        assert_eq!(Opcode::name_of(3), "LISTPEER");
    }
}
