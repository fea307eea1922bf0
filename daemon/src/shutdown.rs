//! Graceful shutdown on SIGINT/SIGTERM.
//!
//! The discovery loop selects on a `tokio::sync::watch` receiver; the
//! signal task flips it to `true`.

use tokio::signal;
use tokio::sync::watch;

/// Wait for SIGTERM or SIGINT, then flip `tx` to `true`.
pub async fn wait_for_signal(tx: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
        _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
    }

    let _ = tx.send(true);
}
