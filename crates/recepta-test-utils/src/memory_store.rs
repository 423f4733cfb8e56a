// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ConversationStore for tests, with failure injection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use recepta_core::traits::ConversationStore;
use recepta_core::types::{Conversation, ConversationDefaults, Message, NewMessage};
use recepta_core::ReceptaError;

/// A HashMap-backed store with the same upsert semantics as the SQLite
/// implementation.
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    fail_next: AtomicBool,
}

struct Inner {
    /// Conversations keyed by external id (the natural key).
    conversations: HashMap<String, Conversation>,
    messages: Vec<Message>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                conversations: HashMap::new(),
                messages: Vec::new(),
                next_id: 1,
            })),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next store operation fail with a storage error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn take_failure(&self) -> Result<(), ReceptaError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ReceptaError::Storage {
                source: "injected failure".into(),
            });
        }
        Ok(())
    }

    pub async fn conversation_count(&self) -> usize {
        self.inner.lock().await.conversations.len()
    }

    pub async fn get_conversation(&self, external_id: &str) -> Option<Conversation> {
        self.inner.lock().await.conversations.get(external_id).cloned()
    }

    pub async fn all_messages(&self) -> Vec<Message> {
        self.inner.lock().await.messages.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn upsert_conversation(
        &self,
        external_id: &str,
        defaults: ConversationDefaults,
    ) -> Result<Conversation, ReceptaError> {
        self.take_failure()?;
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.conversations.get(external_id) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let id = format!("conv-{}", inner.next_id);
        inner.next_id += 1;
        let conversation = Conversation {
            id,
            external_id: external_id.to_string(),
            display_name: defaults.display_name,
            phone_number: defaults.phone_number,
            status: "active".to_string(),
            last_message: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };
        inner
            .conversations
            .insert(external_id.to_string(), conversation.clone());
        Ok(conversation)
    }

    async fn touch_conversation(
        &self,
        id: &str,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ReceptaError> {
        self.take_failure()?;
        let mut inner = self.inner.lock().await;
        for conversation in inner.conversations.values_mut() {
            if conversation.id == id {
                conversation.last_message = Some(last_message.to_string());
                conversation.last_message_at = Some(at);
                conversation.updated_at = at;
                return Ok(());
            }
        }
        Err(ReceptaError::Storage {
            source: format!("no conversation with id {id}").into(),
        })
    }

    async fn insert_message(&self, new: &NewMessage) -> Result<Message, ReceptaError> {
        self.take_failure()?;
        let mut inner = self.inner.lock().await;
        let id = format!("m-{}", inner.next_id);
        inner.next_id += 1;
        let message = Message {
            id,
            external_id: format!("msg-{}", uuid::Uuid::new_v4()),
            conversation_id: new.conversation_id.clone(),
            sender: new.sender,
            content: new.content.clone(),
            created_at: new.created_at,
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, ReceptaError> {
        self.take_failure()?;
        let inner = self.inner.lock().await;
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for same-instant messages.
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}
