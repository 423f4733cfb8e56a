// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the serve loop monitors. The outbound queue
//! is given a bounded window to drain before the process exits.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::queue::OutboundQueue;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
/// The signal handler task runs in the background until the token is cancelled.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, using Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received Ctrl+C, initiating shutdown");
                    token_clone.cancel();
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for the outbound queue to empty.
///
/// Messages still pending when the window closes are abandoned; they were
/// never acknowledged to anyone, so losing them is safe.
pub async fn drain_queue(queue: &OutboundQueue, timeout: Duration) {
    let pending = queue.pending_count().await;
    if pending == 0 {
        info!("outbound queue already empty");
        return;
    }

    info!(pending, "waiting for outbound queue to drain");
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if queue.pending_count().await == 0 {
            info!("outbound queue drained");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let remaining = queue.pending_count().await;
    if remaining > 0 {
        warn!(remaining, "timeout reached, abandoning undelivered messages");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionManager, ReconnectPolicy};
    use crate::queue::DeliveryPolicy;
    use std::sync::Arc;

    use recepta_core::traits::StatusSink;
    use recepta_core::types::StatusSnapshot;
    use recepta_keystore::CredentialStore;
    use recepta_test_utils::MockTransport;
    use tempfile::tempdir;

    struct NullSink;

    #[async_trait::async_trait]
    impl StatusSink for NullSink {
        async fn publish(&self, _snapshot: StatusSnapshot) {}
    }

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        // Token should not be cancelled yet.
        assert!(!token.is_cancelled());
        // Cancel it manually to clean up the background task.
        token.cancel();
    }

    #[tokio::test]
    async fn drain_empty_queue_returns_immediately() {
        let transport = Arc::new(MockTransport::new());
        let dir = tempdir().unwrap();
        let keystore = CredentialStore::new(dir.path().join("creds.json"));
        let (manager, _inbound) = ConnectionManager::new(
            transport,
            keystore,
            Arc::new(NullSink),
            ReconnectPolicy::default(),
        );
        let queue = OutboundQueue::new(manager, DeliveryPolicy::default());
        drain_queue(&queue, Duration::from_millis(10)).await;
    }
}
