use beacon_types::{Endpoint, TransportId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("already bound to {0}")]
    AlreadyBound(Endpoint),

    #[error("transport factory is not bound")]
    NotBound,

    #[error("{0} not found")]
    TransportNotFound(TransportId),

    #[error("protocol error: {0}")]
    Protocol(#[from] beacon_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
