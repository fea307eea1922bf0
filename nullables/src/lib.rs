//! Nullable infrastructure for deterministic testing.
//!
//! The discovery layer reaches the outside world through three seams: the
//! clock, the transport factory and the application delegate. The types
//! here stand in for all three. Time only moves when a test advances it,
//! dials complete when a test says so, and every packet sent is kept for
//! inspection instead of leaving the process.

pub mod clock;
pub mod delegate;
pub mod transport;

pub use clock::NullClock;
pub use delegate::RecordingDelegate;
pub use transport::NullTransportFactory;
