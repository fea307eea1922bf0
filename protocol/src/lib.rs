//! Wire protocol — discovery frame opcodes, encoding and decoding.
//!
//! Every frame starts with a reserved byte (always `0`) followed by an
//! opcode byte. Payload layouts are documented on [`Frame`].

pub mod error;
pub mod frame;
pub mod opcode;

pub use error::ProtocolError;
pub use frame::{opcode_of, Frame, HEADER_SIZE};
pub use opcode::Opcode;
