// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery queue with bounded retry.
//!
//! Messages are held in per-destination FIFO lanes. A sweep task attempts
//! the head of every lane each cycle: success pops it and keeps draining
//! the lane, failure bumps its attempt counter and leaves the lane alone
//! until the next sweep. A message that exhausts its attempt budget is
//! moved to the failed-delivery ledger and never retried again.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use recepta_config::model::DeliveryConfig;
use recepta_core::types::{DeliveryFailure, OutboundPayload, PeerId, QueuedMessage};
use recepta_core::ReceptaError;

use crate::connection::ConnectionManager;

/// Bounded retry policy: capped attempts, fixed sweep interval.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    pub max_attempts: u32,
    pub retry_interval: Duration,
}

impl DeliveryPolicy {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_interval: Duration::from_millis(config.retry_interval_ms),
        }
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::from_config(&DeliveryConfig::default())
    }
}

/// Retry queue for outbound messages, one FIFO lane per destination.
pub struct OutboundQueue {
    connection: Arc<ConnectionManager>,
    policy: DeliveryPolicy,
    inner: Mutex<QueueInner>,
    /// Wakes the sweep task for an immediate attempt after an enqueue.
    kick: Notify,
    cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct QueueInner {
    lanes: HashMap<PeerId, VecDeque<QueuedMessage>>,
    failed: Vec<DeliveryFailure>,
}

impl OutboundQueue {
    pub fn new(connection: Arc<ConnectionManager>, policy: DeliveryPolicy) -> Arc<Self> {
        Arc::new(Self {
            connection,
            policy,
            inner: Mutex::new(QueueInner::default()),
            kick: Notify::new(),
            cancel: CancellationToken::new(),
            sweeper: Mutex::new(None),
        })
    }

    /// Starts the background sweep task. Call once after construction.
    pub async fn start(self: &Arc<Self>) {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.is_some() {
            return;
        }
        let this = Arc::clone(self);
        *sweeper = Some(tokio::spawn(async move {
            this.sweep_loop().await;
        }));
    }

    /// Stops the sweep task. Queued messages stay in their lanes.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.sweeper.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "sweep task join failed");
            }
        }
    }

    /// Accepts a message for delivery and returns its assigned id.
    ///
    /// Enqueue always succeeds regardless of connection state; delivery is
    /// attempted by the sweep task.
    pub async fn enqueue(&self, destination: PeerId, payload: OutboundPayload) -> String {
        let message = QueuedMessage {
            id: uuid::Uuid::new_v4().to_string(),
            destination: destination.clone(),
            payload,
            attempts: 0,
            enqueued_at: Utc::now(),
        };
        let id = message.id.clone();
        debug!(message_id = %id, destination = %destination, kind = message.payload.kind(), "message enqueued");
        self.inner
            .lock()
            .await
            .lanes
            .entry(destination)
            .or_default()
            .push_back(message);
        self.kick.notify_one();
        id
    }

    /// Messages currently waiting for delivery, across all lanes.
    pub async fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .lanes
            .values()
            .map(VecDeque::len)
            .sum()
    }

    /// Snapshot of the pending messages for one destination, in order.
    pub async fn pending_for(&self, destination: &PeerId) -> Vec<QueuedMessage> {
        self.inner
            .lock()
            .await
            .lanes
            .get(destination)
            .map(|lane| lane.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Terminally failed deliveries, oldest first.
    pub async fn failed_deliveries(&self) -> Vec<DeliveryFailure> {
        self.inner.lock().await.failed.clone()
    }

    async fn sweep_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = self.kick.notified() => {}
                _ = tokio::time::sleep(self.policy.retry_interval) => {}
            }
            self.sweep_once().await;
        }
    }

    /// One delivery pass over every lane.
    ///
    /// Each lane gets at most one failed attempt per sweep; successful
    /// deliveries keep draining the lane within the same pass so a healthy
    /// connection empties backlogs quickly.
    async fn sweep_once(&self) {
        let destinations: Vec<PeerId> = {
            let inner = self.inner.lock().await;
            inner.lanes.keys().cloned().collect()
        };

        for destination in destinations {
            loop {
                // Clone the head; the send happens outside the lock.
                let head = {
                    let inner = self.inner.lock().await;
                    inner.lanes.get(&destination).and_then(|l| l.front().cloned())
                };
                let Some(message) = head else { break };

                match self
                    .connection
                    .send(&message.destination, &message.payload)
                    .await
                {
                    Ok(()) => {
                        let mut inner = self.inner.lock().await;
                        if let Some(lane) = inner.lanes.get_mut(&destination) {
                            lane.pop_front();
                            if lane.is_empty() {
                                inner.lanes.remove(&destination);
                            }
                        }
                        debug!(message_id = %message.id, destination = %destination, "message delivered");
                    }
                    Err(e) => {
                        self.record_failure(&destination, &e).await;
                        break;
                    }
                }
            }
        }
    }

    async fn record_failure(&self, destination: &PeerId, error: &ReceptaError) {
        let mut inner = self.inner.lock().await;
        let Some(lane) = inner.lanes.get_mut(destination) else {
            return;
        };
        let Some(message) = lane.front_mut() else {
            return;
        };
        message.attempts += 1;
        let attempts = message.attempts;
        let id = message.id.clone();

        if attempts >= self.policy.max_attempts {
            // Sole terminal outcome for this message: into the ledger, out
            // of the lane.
            if let Some(message) = lane.pop_front() {
                if lane.is_empty() {
                    inner.lanes.remove(destination);
                }
                error!(
                    message_id = %id,
                    destination = %destination,
                    attempts,
                    error = %error,
                    "delivery failed terminally"
                );
                inner.failed.push(DeliveryFailure {
                    message,
                    reason: error.to_string(),
                    failed_at: Utc::now(),
                });
            }
        } else {
            warn!(
                message_id = %id,
                destination = %destination,
                attempt = attempts,
                max = self.policy.max_attempts,
                error = %error,
                "delivery attempt failed, will retry"
            );
        }
    }
}
