// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements [`Transport`] with scriptable open outcomes.
//! Each opened session exposes a [`MockSessionHandle`] that tests use to
//! emit lifecycle and message events, flip send failures on and off, and
//! inspect everything the core tried to send.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore, mpsc};

use recepta_core::traits::{Transport, TransportEvent, TransportSession};
use recepta_core::types::{CloseReason, CredentialBlob, OutboundPayload, PeerId};
use recepta_core::ReceptaError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A scriptable fake of the external messaging transport.
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    /// Scripted failures consumed by upcoming `open` calls.
    open_errors: VecDeque<String>,
    /// Handles for every session opened so far, in order.
    sessions: Vec<MockSessionHandle>,
    /// Credentials passed to each `open` call.
    opened_with: Vec<CredentialBlob>,
    /// When true (default), `open` emits `Opened` immediately.
    auto_open_event: bool,
    /// When set, every `open` parks until the test adds a permit.
    open_gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                open_errors: VecDeque::new(),
                sessions: Vec::new(),
                opened_with: Vec::new(),
                auto_open_event: true,
                open_gate: None,
            })),
        }
    }

    /// Script the next `open` call to fail with the given message.
    pub async fn fail_next_open(&self, message: impl Into<String>) {
        self.inner.lock().await.open_errors.push_back(message.into());
    }

    /// Disable the automatic `Opened` event so tests drive the handshake.
    pub async fn set_auto_open(&self, auto: bool) {
        self.inner.lock().await.auto_open_event = auto;
    }

    /// Park every upcoming `open` call until a permit is added to the
    /// returned gate. Lets tests freeze the handshake mid-flight.
    pub async fn gate_opens(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.inner.lock().await.open_gate = Some(gate.clone());
        gate
    }

    /// Number of sessions opened so far (failed opens not counted).
    pub async fn open_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    /// Handle for the most recently opened session.
    pub async fn last_session(&self) -> Option<MockSessionHandle> {
        self.inner.lock().await.sessions.last().cloned()
    }

    /// Credentials the core passed to each open, in order.
    pub async fn opened_with(&self) -> Vec<CredentialBlob> {
        self.inner.lock().await.opened_with.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(
        &self,
        credentials: CredentialBlob,
    ) -> Result<(Box<dyn TransportSession>, mpsc::Receiver<TransportEvent>), ReceptaError> {
        let gate = {
            let mut inner = self.inner.lock().await;
            inner.opened_with.push(credentials);

            if let Some(message) = inner.open_errors.pop_front() {
                return Err(ReceptaError::transport(message));
            }
            inner.open_gate.clone()
        };

        // Park outside the lock so the test can keep inspecting the mock.
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| ReceptaError::transport("open gate closed"))?;
            permit.forget();
        }

        let mut inner = self.inner.lock().await;
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let sent = Arc::new(Mutex::new(Vec::new()));
        let fail_sends = Arc::new(AtomicBool::new(false));
        let logout_count = Arc::new(AtomicUsize::new(0));

        let handle = MockSessionHandle {
            events: events_tx.clone(),
            sent: sent.clone(),
            fail_sends: fail_sends.clone(),
            logout_count: logout_count.clone(),
        };

        if inner.auto_open_event {
            // Capacity is fresh, so this cannot block under the lock.
            let _ = events_tx.try_send(TransportEvent::Opened);
        }

        inner.sessions.push(handle);

        let session = MockSession {
            sent,
            fail_sends,
            logout_count,
        };
        Ok((Box::new(session), events_rx))
    }
}

/// Test-side controls for one opened mock session.
#[derive(Clone)]
pub struct MockSessionHandle {
    events: mpsc::Sender<TransportEvent>,
    sent: Arc<Mutex<Vec<(PeerId, OutboundPayload)>>>,
    fail_sends: Arc<AtomicBool>,
    logout_count: Arc<AtomicUsize>,
}

impl MockSessionHandle {
    /// Emit an arbitrary transport event into the session's stream.
    pub async fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event).await;
    }

    /// Emit a `Closed` event with the given reason.
    pub async fn close(&self, reason: CloseReason) {
        self.emit(TransportEvent::Closed { reason }).await;
    }

    /// Everything sent through this session, in order.
    pub async fn sent_messages(&self) -> Vec<(PeerId, OutboundPayload)> {
        self.sent.lock().await.clone()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// How many times `logout` was called on this session.
    pub fn logout_count(&self) -> usize {
        self.logout_count.load(Ordering::SeqCst)
    }
}

struct MockSession {
    sent: Arc<Mutex<Vec<(PeerId, OutboundPayload)>>>,
    fail_sends: Arc<AtomicBool>,
    logout_count: Arc<AtomicUsize>,
}

#[async_trait]
impl TransportSession for MockSession {
    async fn send(
        &self,
        destination: &PeerId,
        payload: &OutboundPayload,
    ) -> Result<(), ReceptaError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ReceptaError::transport("mock send failure"));
        }
        self.sent
            .lock()
            .await
            .push((destination.clone(), payload.clone()));
        Ok(())
    }

    async fn logout(&self) -> Result<(), ReceptaError> {
        self.logout_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
