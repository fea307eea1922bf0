//! Shared utilities for the beacon discovery layer.

pub mod logging;

pub use logging::{init_logging, LogFormat};
