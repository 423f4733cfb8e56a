// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seam for conversation and message records.

use async_trait::async_trait;

use crate::error::ReceptaError;
use crate::types::{Conversation, ConversationDefaults, Message, NewMessage};

/// Durable storage for conversations and their messages.
///
/// Conversation creation is always an upsert keyed on the peer's external id;
/// a blind insert would risk duplicate conversations for the same peer.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the conversation for `external_id`, creating it with the
    /// given defaults if absent. Existing conversations keep their identity
    /// fields untouched.
    async fn upsert_conversation(
        &self,
        external_id: &str,
        defaults: ConversationDefaults,
    ) -> Result<Conversation, ReceptaError>;

    /// Updates a conversation's last-message preview and timestamp.
    async fn touch_conversation(
        &self,
        id: &str,
        last_message: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), ReceptaError>;

    /// Persists a new message, assigning its unique ids.
    async fn insert_message(&self, new: &NewMessage) -> Result<Message, ReceptaError>;

    /// Lists a conversation's messages ordered by creation time ascending.
    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, ReceptaError>;
}
