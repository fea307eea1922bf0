//! Async event loop driving a discovery node over UDP.
//!
//! The node itself is synchronous. The driver alternates between draining
//! transport events, firing due timers, and waiting on whichever comes
//! first: a datagram, the next timer deadline, or shutdown. It must run on a
//! single thread (the node is not `Send`), e.g. under
//! `Runtime::block_on` of a current-thread runtime.

use std::io;
use std::time::Duration;

use tokio::sync::watch;

use crate::transport::{process_events, DiscoveryNode};
use crate::udp::MAX_DATAGRAM_SIZE;
use crate::{NetworkError, UdpTransportFactory};

/// Upper bound on one idle wait when no timer is scheduled.
const IDLE_WAIT_MS: u64 = 1_000;

/// Consecutive receive failures after which the loop gives up.
const MAX_RECV_FAILURES: u32 = 10;

/// Pause after the first failed receive, grown linearly per failure.
const RECV_BACKOFF_MS: u64 = 100;

#[derive(Debug, Default)]
struct RecvFailures {
    count: u32,
}

impl RecvFailures {
    fn reset(&mut self) {
        self.count = 0;
    }

    /// Pause to take before receiving again, or the error once too many
    /// receives in a row have failed.
    fn record(&mut self, error: io::Error) -> Result<Duration, NetworkError> {
        self.count += 1;
        if self.count >= MAX_RECV_FAILURES {
            tracing::error!(error = %error, failures = self.count, "UDP receive keeps failing");
            return Err(error.into());
        }
        tracing::warn!(error = %error, failures = self.count, "UDP receive failed");
        Ok(Duration::from_millis(RECV_BACKOFF_MS * u64::from(self.count)))
    }
}

/// Run `node` until `shutdown` flips to `true` or its sender is dropped.
/// Fails with [`NetworkError::Io`] when the socket stops delivering.
pub async fn run<N>(node: &mut N, mut shutdown: watch::Receiver<bool>) -> Result<(), NetworkError>
where
    N: DiscoveryNode<Factory = UdpTransportFactory>,
{
    let socket = node.factory().socket().ok_or(NetworkError::NotBound)?;
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut failures = RecvFailures::default();

    loop {
        process_events(node);
        node.poll_timers();
        process_events(node);

        let wait_ms = node.next_timeout_ms().unwrap_or(IDLE_WAIT_MS);

        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((n, from)) => {
                    failures.reset();
                    node.factory_mut().ingest(buf[..n].to_vec(), from);
                }
                Err(e) => {
                    let pause = failures.record(e)?;
                    tokio::time::sleep(pause).await;
                }
            },
            _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("discovery loop stopping");
                    break;
                }
            }
        }
    }

    Ok(())
}
