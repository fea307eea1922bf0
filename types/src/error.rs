//! Error type shared by the value types of this crate.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("need {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("unsupported address family tag: {0:#06x}")]
    UnsupportedFamily(u16),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
