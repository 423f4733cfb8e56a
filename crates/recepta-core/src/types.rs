// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Recepta messaging core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The stable protocol-level address of a remote peer.
///
/// Used as the natural key for conversation identity: exactly one
/// conversation exists per distinct peer id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl PeerId {
    /// Returns the peer address without its transport namespace prefix.
    ///
    /// `peer:51999888777` becomes `51999888777`. Addresses without a
    /// namespace are returned unchanged.
    pub fn local_part(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, rest)) => rest,
            None => &self.0,
        }
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// States of the connection state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No live session. Initial state, and terminal after reconnect exhaustion.
    Disconnected,
    /// A connect sequence is in flight.
    Connecting,
    /// The transport session is open and accepting sends.
    Connected,
    /// The remote end terminated the session. Terminal until a manual connect.
    LoggedOut,
}

/// Why a transport session closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Remote-initiated session termination. No automatic reconnect.
    LoggedOut,
    /// Any other drop (network fault, server restart). Eligible for reconnect.
    Dropped { code: Option<u32> },
}

impl CloseReason {
    pub fn is_logout(&self) -> bool {
        matches!(self, CloseReason::LoggedOut)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::LoggedOut => write!(f, "logged out"),
            CloseReason::Dropped { code: Some(code) } => write!(f, "dropped (code {code})"),
            CloseReason::Dropped { code: None } => write!(f, "dropped"),
        }
    }
}

/// A read-only snapshot of the connection state, pushed to the status sink
/// on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub changed_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    pub fn new(state: ConnectionState, last_error: Option<String>) -> Self {
        Self {
            state,
            changed_at: Utc::now(),
            last_error,
        }
    }
}

/// An outbound message payload, one variant per message kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundPayload {
    Text {
        body: String,
    },
    Media {
        url: String,
        caption: Option<String>,
    },
    Template {
        name: String,
        params: Vec<String>,
    },
}

impl OutboundPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundPayload::Text { .. } => "text",
            OutboundPayload::Media { .. } => "media",
            OutboundPayload::Template { .. } => "template",
        }
    }
}

/// A message held by the outbound queue until it reaches a terminal outcome.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Collision-free unique id assigned at enqueue time.
    pub id: String,
    pub destination: PeerId,
    pub payload: OutboundPayload,
    /// Number of failed delivery attempts so far. Monotonically increasing.
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

/// A terminally failed delivery, retained for external observers.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub message: QueuedMessage,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Who authored a persisted message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Peer,
    Bot,
    System,
}

/// A durable conversation record, one per distinct peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Transport-level peer identifier. Unique natural key.
    pub external_id: String,
    pub display_name: String,
    pub phone_number: String,
    pub status: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity fields used only when a conversation is first created.
///
/// Upserting an existing conversation leaves its identity untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationDefaults {
    pub display_name: String,
    pub phone_number: String,
}

impl ConversationDefaults {
    /// Defaults for a previously unknown peer: display name "Guest" and the
    /// phone number derived from the peer address.
    pub fn for_peer(peer: &PeerId) -> Self {
        Self {
            display_name: "Guest".to_string(),
            phone_number: peer.local_part().to_string(),
        }
    }
}

/// A durable message record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Unique generated identifier, stable across restarts.
    pub external_id: String,
    pub conversation_id: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a message; ids are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A raw inbound event from the transport, before ingestion.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub peer: PeerId,
    pub body: InboundBody,
    pub received_at: DateTime<Utc>,
}

/// The content of an inbound transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundBody {
    Text { body: String },
    Media { caption: Option<String> },
    /// Reactions, protocol notifications, and other kinds with no text.
    Unsupported,
}

impl InboundBody {
    /// Returns the extractable text content, if any.
    ///
    /// Plain text bodies and media captions count; everything else is `None`
    /// and the event is ignored by ingestion.
    pub fn text(&self) -> Option<&str> {
        match self {
            InboundBody::Text { body } => Some(body),
            InboundBody::Media {
                caption: Some(caption),
            } => Some(caption),
            InboundBody::Media { caption: None } | InboundBody::Unsupported => None,
        }
    }
}

/// Opaque, versioned session authentication material.
///
/// The inner payload is owned by the transport library and never
/// reinterpreted here. Debug output intentionally omits the contents.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialBlob {
    pub version: u32,
    pub data: serde_json::Value,
}

impl CredentialBlob {
    /// A fresh, empty credential set for a session that has never paired.
    pub fn fresh() -> Self {
        Self {
            version: 1,
            data: serde_json::Value::Null,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.data.is_null()
    }
}

impl std::fmt::Debug for CredentialBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBlob")
            .field("version", &self.version)
            .field("data", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn peer_id_strips_namespace_prefix() {
        assert_eq!(PeerId::from("peer:123").local_part(), "123");
        assert_eq!(PeerId::from("51999888777").local_part(), "51999888777");
    }

    #[test]
    fn conversation_defaults_use_guest_and_phone() {
        let defaults = ConversationDefaults::for_peer(&PeerId::from("peer:123"));
        assert_eq!(defaults.display_name, "Guest");
        assert_eq!(defaults.phone_number, "123");
    }

    #[test]
    fn connection_state_round_trips_through_strings() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::LoggedOut,
        ] {
            let s = state.to_string();
            assert_eq!(ConnectionState::from_str(&s).unwrap(), state);
        }
        assert_eq!(ConnectionState::LoggedOut.to_string(), "logged_out");
    }

    #[test]
    fn inbound_text_extraction() {
        assert_eq!(
            InboundBody::Text {
                body: "hola".into()
            }
            .text(),
            Some("hola")
        );
        assert_eq!(
            InboundBody::Media {
                caption: Some("the pool".into())
            }
            .text(),
            Some("the pool")
        );
        assert_eq!(InboundBody::Media { caption: None }.text(), None);
        assert_eq!(InboundBody::Unsupported.text(), None);
    }

    #[test]
    fn close_reason_classification() {
        assert!(CloseReason::LoggedOut.is_logout());
        assert!(!CloseReason::Dropped { code: Some(515) }.is_logout());
        assert_eq!(
            CloseReason::Dropped { code: Some(515) }.to_string(),
            "dropped (code 515)"
        );
    }

    #[test]
    fn credential_blob_debug_is_redacted() {
        let blob = CredentialBlob {
            version: 1,
            data: serde_json::json!({"noise_key": "secret"}),
        };
        let debug = format!("{blob:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn fresh_credentials_are_empty() {
        let blob = CredentialBlob::fresh();
        assert!(blob.is_fresh());
        assert_eq!(blob.version, 1);
    }

    #[test]
    fn outbound_payload_kinds() {
        let text = OutboundPayload::Text { body: "hi".into() };
        let media = OutboundPayload::Media {
            url: "https://example.com/a.jpg".into(),
            caption: None,
        };
        let template = OutboundPayload::Template {
            name: "welcome".into(),
            params: vec!["Guest".into()],
        };
        assert_eq!(text.kind(), "text");
        assert_eq!(media.kind(), "media");
        assert_eq!(template.kind(), "template");
    }
}
