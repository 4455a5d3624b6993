//! Abort handling
//!
//! The scheduler aborts a job by signalling the process (SIGINT or SIGTERM).
//! The signal only sets the run's `CancellationFlag`; the runner notices it
//! between operations and takes the normal cleanup path.

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::runner::CancellationFlag;

/// Cancels `cancellation` on SIGINT or SIGTERM
///
/// Must be called from within a tokio runtime.
pub fn spawn_abort_listener(cancellation: CancellationFlag) -> JoinHandle<()> {
    tokio::spawn(cancel_on(abort_signal(), cancellation))
}

/// Waits for `signal`, then cancels
pub async fn cancel_on(signal: impl Future<Output = ()>, cancellation: CancellationFlag) {
    signal.await;
    warn!("Abort signal received, cancelling run");
    cancellation.cancel();
}

async fn abort_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_signal_cancels_flag() {
        let cancellation = CancellationFlag::new();
        let (abort, aborted) = oneshot::channel::<()>();

        let listener = tokio::spawn(cancel_on(
            async move {
                let _ = aborted.await;
            },
            cancellation.clone(),
        ));

        assert!(!cancellation.is_cancelled());
        abort.send(()).unwrap();
        listener.await.unwrap();
        assert!(cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_listener_without_signal_leaves_run_alone() {
        let cancellation = CancellationFlag::new();
        let listener = spawn_abort_listener(cancellation.clone());

        tokio::task::yield_now().await;
        assert!(!cancellation.is_cancelled());
        listener.abort();
    }
}
