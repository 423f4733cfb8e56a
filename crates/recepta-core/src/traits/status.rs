// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status publishing seam for dashboard observers.

use async_trait::async_trait;
use tracing::info;

use crate::types::StatusSnapshot;

/// Receives connection state snapshots.
///
/// Push-only and best-effort: implementations must not block the connection
/// path, and delivery is not guaranteed.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(&self, snapshot: StatusSnapshot);
}

/// A status sink that writes snapshots to the tracing log.
///
/// Default sink when no dashboard channel is wired in.
#[derive(Debug, Default)]
pub struct LogStatusSink;

#[async_trait]
impl StatusSink for LogStatusSink {
    async fn publish(&self, snapshot: StatusSnapshot) {
        match &snapshot.last_error {
            Some(err) => info!(state = %snapshot.state, error = %err, "connection status"),
            None => info!(state = %snapshot.state, "connection status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionState;

    #[tokio::test]
    async fn log_sink_accepts_snapshots() {
        let sink = LogStatusSink;
        sink.publish(StatusSnapshot::new(ConnectionState::Connected, None))
            .await;
        sink.publish(StatusSnapshot::new(
            ConnectionState::Disconnected,
            Some("gave up after 5 attempts".into()),
        ))
        .await;
    }
}
