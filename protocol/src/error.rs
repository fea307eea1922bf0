use beacon_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame truncated: {0} bytes")]
    Truncated(usize),

    #[error("reserved header byte is {0:#04x}, expected 0")]
    ReservedByte(u8),

    #[error("too many protocol descriptors: {count} > {max}")]
    TooManyDescriptors { count: usize, max: usize },

    #[error(transparent)]
    Types(#[from] TypesError),
}
