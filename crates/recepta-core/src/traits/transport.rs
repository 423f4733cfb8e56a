// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport seam: the narrow interface the connection manager drives.
//!
//! The underlying protocol library is callback-driven; here its events become
//! explicit message passing. `Transport::open` hands back a session handle
//! plus a typed event receiver, so ordering and backpressure are visible to
//! the consumer instead of being buried in nested callbacks.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ReceptaError;
use crate::types::{CloseReason, CredentialBlob, InboundEvent, OutboundPayload, PeerId};

/// A lifecycle or message event emitted by a live transport session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The session finished its handshake and is ready to send.
    Opened,
    /// The session closed. The reason decides between reconnect and logout.
    Closed { reason: CloseReason },
    /// The transport rotated its session keys; the new blob must be
    /// persisted before any further event is processed.
    CredentialsRotated(CredentialBlob),
    /// An inbound message from a peer.
    Message(InboundEvent),
}

/// Factory for transport sessions.
///
/// Exactly one live session exists per process; the connection manager owns
/// it and is the only caller of `open`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a session using previously saved credentials.
    ///
    /// Returns the session handle and the receiver for its event stream.
    /// The receiver yields events until the session closes; a closed channel
    /// is treated as an unexpected drop.
    async fn open(
        &self,
        credentials: CredentialBlob,
    ) -> Result<(Box<dyn TransportSession>, mpsc::Receiver<TransportEvent>), ReceptaError>;
}

/// A live transport session.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Dispatches a single payload to a peer. One attempt, no retry here.
    async fn send(
        &self,
        destination: &PeerId,
        payload: &OutboundPayload,
    ) -> Result<(), ReceptaError>;

    /// Logs out of the transport, invalidating the session server-side.
    async fn logout(&self) -> Result<(), ReceptaError>;
}
