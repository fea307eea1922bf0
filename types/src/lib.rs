//! Fundamental types for the beacon discovery layer.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: peer endpoints, protocol descriptors and transport handles.

pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod transport;

pub use descriptor::{ProtocolDescriptor, MAX_DESCRIPTORS};
pub use endpoint::Endpoint;
pub use error::TypesError;
pub use transport::TransportId;
