// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status sink that captures snapshots for assertion.

use async_trait::async_trait;
use tokio::sync::Mutex;

use recepta_core::traits::StatusSink;
use recepta_core::types::{ConnectionState, StatusSnapshot};

/// Records every published snapshot, in order.
#[derive(Default)]
pub struct CapturingStatusSink {
    snapshots: Mutex<Vec<StatusSnapshot>>,
}

impl CapturingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshots(&self) -> Vec<StatusSnapshot> {
        self.snapshots.lock().await.clone()
    }

    /// Just the state transitions, for compact assertions.
    pub async fn states(&self) -> Vec<ConnectionState> {
        self.snapshots.lock().await.iter().map(|s| s.state).collect()
    }

    pub async fn last_state(&self) -> Option<ConnectionState> {
        self.snapshots.lock().await.last().map(|s| s.state)
    }
}

#[async_trait]
impl StatusSink for CapturingStatusSink {
    async fn publish(&self, snapshot: StatusSnapshot) {
        self.snapshots.lock().await.push(snapshot);
    }
}
