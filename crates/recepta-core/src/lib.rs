// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Recepta messaging core.
//!
//! Provides the error type, domain types, and the trait seams to external
//! collaborators: the messaging transport, the conversation/message store,
//! the reply generator, and the status channel.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ReceptaError;
pub use types::{
    CloseReason, ConnectionState, Conversation, ConversationDefaults, CredentialBlob,
    DeliveryFailure, InboundBody, InboundEvent, Message, NewMessage, OutboundPayload, PeerId,
    QueuedMessage, Sender, StatusSnapshot,
};

pub use traits::{
    ConversationStore, LogStatusSink, ReplyGenerator, StatusSink, Transport, TransportEvent,
    TransportSession,
};
