// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection state machine for the single live transport session.
//!
//! States: disconnected -> connecting -> connected, with logged_out as a
//! terminal state that only a fresh manual connect can leave. Non-logout
//! session drops trigger bounded automatic reconnection: a fixed delay
//! between attempts, capped at a maximum attempt count, after which the
//! manager parks itself in disconnected and waits for operator action.
//!
//! The transport's event stream is consumed by a single pump task per
//! session. Inbound messages are forwarded to the ingestion channel; status
//! snapshots go to the status sink on every transition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use recepta_config::model::TransportConfig;
use recepta_core::traits::{StatusSink, Transport, TransportEvent, TransportSession};
use recepta_core::types::{
    CloseReason, ConnectionState, InboundEvent, OutboundPayload, PeerId, StatusSnapshot,
};
use recepta_core::ReceptaError;
use recepta_keystore::CredentialStore;

/// Capacity of the inbound event channel between the pump and the ingester.
const INBOUND_CHANNEL_CAPACITY: usize = 512;

/// Bounded reconnect policy: fixed delay, capped attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

/// Owns the single live transport session and its state machine.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    keystore: CredentialStore,
    status_sink: Arc<dyn StatusSink>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    policy: ReconnectPolicy,
    inner: Mutex<Inner>,
    status: ArcSwap<StatusSnapshot>,
}

struct Inner {
    state: ConnectionState,
    session: Option<Arc<dyn TransportSession>>,
    /// Consecutive failed reconnect attempts. Reset to zero on open.
    reconnect_attempts: u32,
    /// Cancels the current session's pump and any reconnect it scheduled.
    cancel: CancellationToken,
    /// Bumped by every explicit disconnect. A connect sequence that started
    /// under an older epoch must not install its session.
    epoch: u64,
}

/// What to do after a close event, decided under the state lock.
enum CloseAction {
    LoggedOut,
    Retry { attempt: u32 },
    GiveUp { attempts: u32 },
}

impl ConnectionManager {
    /// Creates the manager and the inbound event channel its pump feeds.
    ///
    /// The returned receiver is handed to the ingester; the manager keeps
    /// the sending half.
    pub fn new(
        transport: Arc<dyn Transport>,
        keystore: CredentialStore,
        status_sink: Arc<dyn StatusSink>,
        policy: ReconnectPolicy,
    ) -> (Arc<Self>, mpsc::Receiver<InboundEvent>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let manager = Arc::new(Self {
            transport,
            keystore,
            status_sink,
            inbound_tx,
            policy,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                session: None,
                reconnect_attempts: 0,
                cancel: CancellationToken::new(),
                epoch: 0,
            }),
            status: ArcSwap::from_pointee(StatusSnapshot::new(
                ConnectionState::Disconnected,
                None,
            )),
        });
        (manager, inbound_rx)
    }

    /// Last published status snapshot.
    pub fn status(&self) -> StatusSnapshot {
        self.status.load().as_ref().clone()
    }

    /// Current connection state, as last published.
    pub fn state(&self) -> ConnectionState {
        self.status.load().state
    }

    /// Current reconnect attempt counter.
    pub async fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().await.reconnect_attempts
    }

    /// Opens the transport session.
    ///
    /// A no-op when already connected; an error when another connect is in
    /// flight. The transition to `connected` happens only when the session
    /// reports its `Opened` event.
    ///
    /// Returns a boxed future: the reconnect loop awaits this from a task
    /// the connect path itself spawned, and boxing breaks that cycle of
    /// opaque futures.
    pub fn connect(
        self: &Arc<Self>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ReceptaError>> + Send>> {
        let this = Arc::clone(self);
        Box::pin(this.connect_impl())
    }

    async fn connect_impl(self: Arc<Self>) -> Result<(), ReceptaError> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => return Err(ReceptaError::ConnectInProgress),
                ConnectionState::Disconnected | ConnectionState::LoggedOut => {}
            }
            inner.state = ConnectionState::Connecting;
            inner.epoch
        };
        self.publish(ConnectionState::Connecting, None).await;
        debug!("opening transport session");

        let credentials = match self.keystore.load().await {
            Ok(credentials) => credentials,
            Err(e) => {
                self.fail_connect(epoch, &e).await;
                return Err(e);
            }
        };

        match self.transport.open(credentials).await {
            Ok((session, events)) => {
                let session: Arc<dyn TransportSession> = Arc::from(session);
                let cancel = {
                    let mut inner = self.inner.lock().await;
                    if inner.epoch != epoch {
                        None
                    } else {
                        inner.session = Some(session.clone());
                        inner.cancel = CancellationToken::new();
                        Some(inner.cancel.clone())
                    }
                };
                match cancel {
                    Some(cancel) => {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            this.pump_events(events, cancel).await;
                        });
                    }
                    None => {
                        // A disconnect landed while open was in flight; it
                        // wins, and the late session must not be installed.
                        warn!("connect superseded by disconnect, discarding session");
                        if let Err(e) = session.logout().await {
                            warn!(error = %e, "logout of discarded session failed");
                        }
                    }
                }
                Ok(())
            }
            Err(e) => {
                self.fail_connect(epoch, &e).await;
                Err(e)
            }
        }
    }

    /// Dispatches one payload to the transport. Valid only while connected;
    /// retry on failure is the outbound queue's job, not ours.
    pub async fn send(
        &self,
        destination: &PeerId,
        payload: &OutboundPayload,
    ) -> Result<(), ReceptaError> {
        let session = {
            let inner = self.inner.lock().await;
            if inner.state != ConnectionState::Connected {
                return Err(ReceptaError::NotConnected);
            }
            inner.session.clone().ok_or(ReceptaError::NotConnected)?
        };
        session.send(destination, payload).await
    }

    /// Explicit teardown: logs out of the transport, cancels the pump and
    /// any scheduled reconnect, and always lands in `disconnected`.
    pub async fn disconnect(&self) {
        let session = {
            let mut inner = self.inner.lock().await;
            inner.cancel.cancel();
            inner.epoch += 1;
            inner.state = ConnectionState::Disconnected;
            inner.reconnect_attempts = 0;
            inner.session.take()
        };
        if let Some(session) = session {
            if let Err(e) = session.logout().await {
                warn!(error = %e, "transport logout failed during disconnect");
            }
        }
        info!("disconnected by request");
        self.publish(ConnectionState::Disconnected, None).await;
    }

    async fn fail_connect(&self, epoch: u64, error: &ReceptaError) {
        {
            let mut inner = self.inner.lock().await;
            // A disconnect (and possibly a newer connect) already moved the
            // machine on; this stale failure must not touch it.
            if inner.epoch != epoch {
                return;
            }
            inner.state = ConnectionState::Disconnected;
            inner.session = None;
        }
        self.publish(ConnectionState::Disconnected, Some(error.to_string()))
            .await;
    }

    async fn publish(&self, state: ConnectionState, last_error: Option<String>) {
        let snapshot = StatusSnapshot::new(state, last_error);
        self.status.store(Arc::new(snapshot.clone()));
        self.status_sink.publish(snapshot).await;
    }

    /// Consumes one session's event stream until it closes or is cancelled.
    async fn pump_events(
        self: Arc<Self>,
        mut events: mpsc::Receiver<TransportEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("event pump cancelled");
                    return;
                }
                event = events.recv() => match event {
                    Some(event) => event,
                    // Stream ended without a Closed event: treat as a drop.
                    None => {
                        self.on_closed(CloseReason::Dropped { code: None }, &cancel).await;
                        return;
                    }
                },
            };

            match event {
                TransportEvent::Opened => {
                    {
                        let mut inner = self.inner.lock().await;
                        inner.state = ConnectionState::Connected;
                        inner.reconnect_attempts = 0;
                    }
                    info!("transport session open");
                    self.publish(ConnectionState::Connected, None).await;
                }
                TransportEvent::Closed { reason } => {
                    self.on_closed(reason, &cancel).await;
                    return;
                }
                TransportEvent::CredentialsRotated(blob) => {
                    // Persist before processing anything else; a crash here
                    // must not lose the rotation.
                    if let Err(e) = self.keystore.save(&blob).await {
                        error!(error = %e, "failed to persist rotated credentials");
                    } else {
                        debug!("rotated credentials persisted");
                    }
                }
                TransportEvent::Message(inbound) => {
                    if self.inbound_tx.send(inbound).await.is_err() {
                        warn!("inbound channel closed, dropping message");
                    }
                }
            }
        }
    }

    async fn on_closed(self: &Arc<Self>, reason: CloseReason, cancel: &CancellationToken) {
        let action = {
            let mut inner = self.inner.lock().await;
            inner.session = None;
            if reason.is_logout() {
                inner.state = ConnectionState::LoggedOut;
                CloseAction::LoggedOut
            } else if inner.reconnect_attempts >= self.policy.max_attempts {
                inner.state = ConnectionState::Disconnected;
                CloseAction::GiveUp {
                    attempts: inner.reconnect_attempts,
                }
            } else {
                inner.reconnect_attempts += 1;
                inner.state = ConnectionState::Disconnected;
                CloseAction::Retry {
                    attempt: inner.reconnect_attempts,
                }
            }
        };

        match action {
            CloseAction::LoggedOut => {
                warn!(%reason, "remote terminated the session; manual re-pairing required");
                self.publish(ConnectionState::LoggedOut, Some(reason.to_string()))
                    .await;
            }
            CloseAction::GiveUp { attempts } => {
                error!(attempts, "reconnect attempts exhausted");
                self.publish(
                    ConnectionState::Disconnected,
                    Some(format!("gave up after {attempts} reconnect attempts")),
                )
                .await;
            }
            CloseAction::Retry { attempt } => {
                warn!(
                    %reason,
                    attempt,
                    max = self.policy.max_attempts,
                    "session closed, reconnect scheduled"
                );
                self.publish(ConnectionState::Disconnected, Some(reason.to_string()))
                    .await;
                let this = Arc::clone(self);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    this.reconnect_after_delay(cancel).await;
                });
            }
        }
    }

    /// Waits the inter-attempt delay, then retries connect until it sticks,
    /// the attempt budget runs out, or an explicit disconnect cancels us.
    async fn reconnect_after_delay(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("scheduled reconnect cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.policy.delay) => {}
            }

            match self.connect().await {
                Ok(()) => return,
                // Someone else is already driving a connect; stand down.
                Err(ReceptaError::ConnectInProgress) => return,
                Err(e) => {
                    let retry = {
                        let mut inner = self.inner.lock().await;
                        if inner.reconnect_attempts >= self.policy.max_attempts {
                            false
                        } else {
                            inner.reconnect_attempts += 1;
                            true
                        }
                    };
                    if retry {
                        warn!(error = %e, "reconnect attempt failed, retrying");
                        continue;
                    }
                    error!(error = %e, "reconnect attempts exhausted");
                    self.publish(
                        ConnectionState::Disconnected,
                        Some(format!(
                            "gave up after {} reconnect attempts",
                            self.policy.max_attempts
                        )),
                    )
                    .await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recepta_core::types::CredentialBlob;
    use recepta_test_utils::{CapturingStatusSink, MockTransport};
    use tempfile::tempdir;

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(10),
        }
    }

    fn setup(
        transport: Arc<MockTransport>,
        dir: &tempfile::TempDir,
    ) -> (
        Arc<ConnectionManager>,
        mpsc::Receiver<InboundEvent>,
        Arc<CapturingStatusSink>,
    ) {
        let sink = Arc::new(CapturingStatusSink::new());
        let keystore = CredentialStore::new(dir.path().join("creds.json"));
        let (manager, inbound) =
            ConnectionManager::new(transport, keystore, sink.clone(), fast_policy());
        (manager, inbound, sink)
    }

    async fn wait_for_state(manager: &ConnectionManager, state: ConnectionState) {
        for _ in 0..200 {
            if manager.state() == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!(
            "state never reached {state}, still {}",
            manager.state()
        );
    }

    #[tokio::test]
    async fn connect_reaches_connected_on_open_event() {
        let transport = Arc::new(MockTransport::new());
        let dir = tempdir().unwrap();
        let (manager, _inbound, sink) = setup(transport.clone(), &dir);

        manager.connect().await.unwrap();
        wait_for_state(&manager, ConnectionState::Connected).await;

        assert_eq!(manager.reconnect_attempts().await, 0);
        let states = sink.states().await;
        assert_eq!(
            states,
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
    }

    #[tokio::test]
    async fn connect_is_idempotent_when_connected() {
        let transport = Arc::new(MockTransport::new());
        let dir = tempdir().unwrap();
        let (manager, _inbound, _sink) = setup(transport.clone(), &dir);

        manager.connect().await.unwrap();
        wait_for_state(&manager, ConnectionState::Connected).await;

        // Second connect is a no-op, not an error, and opens nothing new.
        manager.connect().await.unwrap();
        assert_eq!(transport.open_count().await, 1);
    }

    #[tokio::test]
    async fn send_fails_fast_when_disconnected() {
        let transport = Arc::new(MockTransport::new());
        let dir = tempdir().unwrap();
        let (manager, _inbound, _sink) = setup(transport, &dir);

        let result = manager
            .send(
                &PeerId::from("peer:123"),
                &OutboundPayload::Text { body: "hi".into() },
            )
            .await;
        assert!(matches!(result, Err(ReceptaError::NotConnected)));
    }

    #[tokio::test]
    async fn logout_close_is_terminal() {
        let transport = Arc::new(MockTransport::new());
        let dir = tempdir().unwrap();
        let (manager, _inbound, _sink) = setup(transport.clone(), &dir);

        manager.connect().await.unwrap();
        wait_for_state(&manager, ConnectionState::Connected).await;

        let session = transport.last_session().await.unwrap();
        session.close(CloseReason::LoggedOut).await;
        wait_for_state(&manager, ConnectionState::LoggedOut).await;

        // No reconnect is attempted from logged_out.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.open_count().await, 1);
    }

    #[tokio::test]
    async fn rotated_credentials_are_persisted() {
        let transport = Arc::new(MockTransport::new());
        let dir = tempdir().unwrap();
        let (manager, _inbound, _sink) = setup(transport.clone(), &dir);

        manager.connect().await.unwrap();
        wait_for_state(&manager, ConnectionState::Connected).await;

        let session = transport.last_session().await.unwrap();
        session
            .emit(TransportEvent::CredentialsRotated(CredentialBlob {
                version: 1,
                data: serde_json::json!({"rotation": 7}),
            }))
            .await;

        // Poll until the pump has written the file.
        let keystore = CredentialStore::new(dir.path().join("creds.json"));
        for _ in 0..200 {
            let blob = keystore.load().await.unwrap();
            if !blob.is_fresh() {
                assert_eq!(blob.data["rotation"], 7);
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("rotated credentials never persisted");
    }

    #[tokio::test]
    async fn connect_while_connecting_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        let gate = transport.gate_opens().await;
        let dir = tempdir().unwrap();
        let (manager, _inbound, _sink) = setup(transport.clone(), &dir);

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.connect().await })
        };
        wait_for_state(&manager, ConnectionState::Connecting).await;

        let second = manager.connect().await;
        assert!(matches!(second, Err(ReceptaError::ConnectInProgress)));

        gate.add_permits(1);
        first.await.unwrap().unwrap();
        wait_for_state(&manager, ConnectionState::Connected).await;
        assert_eq!(transport.open_count().await, 1);
    }

    #[tokio::test]
    async fn disconnect_during_open_discards_the_late_session() {
        let transport = Arc::new(MockTransport::new());
        let gate = transport.gate_opens().await;
        let dir = tempdir().unwrap();
        let (manager, _inbound, sink) = setup(transport.clone(), &dir);

        let connecting = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.connect().await })
        };
        // Wait until the open call is parked on the gate.
        for _ in 0..200 {
            if transport.opened_with().await.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        manager.disconnect().await;
        gate.add_permits(1);
        connecting.await.unwrap().unwrap();

        // The session that finished opening after the disconnect is logged
        // out, never installed, and the state stays down.
        let session = transport.last_session().await.unwrap();
        for _ in 0..200 {
            if session.logout_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(session.logout_count(), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(
            sink.last_state().await,
            Some(ConnectionState::Disconnected)
        );

        let result = manager
            .send(
                &PeerId::from("peer:123"),
                &OutboundPayload::Text { body: "hi".into() },
            )
            .await;
        assert!(matches!(result, Err(ReceptaError::NotConnected)));
    }

    #[tokio::test]
    async fn disconnect_logs_out_and_suppresses_reconnect() {
        let transport = Arc::new(MockTransport::new());
        let dir = tempdir().unwrap();
        let (manager, _inbound, _sink) = setup(transport.clone(), &dir);

        manager.connect().await.unwrap();
        wait_for_state(&manager, ConnectionState::Connected).await;

        let session = transport.last_session().await.unwrap();
        manager.disconnect().await;

        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(session.logout_count(), 1);

        // No automatic reconnect after an explicit disconnect.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.open_count().await, 1);
    }
}
