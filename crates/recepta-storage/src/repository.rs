// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use recepta_config::model::StorageConfig;
use recepta_core::traits::ConversationStore;
use recepta_core::types::{Conversation, ConversationDefaults, Message, NewMessage};
use recepta_core::ReceptaError;

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// Message ids and external ids are assigned here, from random UUIDs, so
/// bursts within the same millisecond can never collide.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store at the configured path, applying migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, ReceptaError> {
        let db = Database::open_with_journal(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Open an in-place store from an existing database handle.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Checkpoint and close the underlying database.
    pub async fn close(self) -> Result<(), ReceptaError> {
        self.db.close().await
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn upsert_conversation(
        &self,
        external_id: &str,
        defaults: ConversationDefaults,
    ) -> Result<Conversation, ReceptaError> {
        queries::conversations::upsert_conversation(&self.db, external_id, &defaults).await
    }

    async fn touch_conversation(
        &self,
        id: &str,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ReceptaError> {
        queries::conversations::touch_conversation(&self.db, id, last_message, at).await
    }

    async fn insert_message(&self, new: &NewMessage) -> Result<Message, ReceptaError> {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            external_id: format!("msg-{}", uuid::Uuid::new_v4()),
            conversation_id: new.conversation_id.clone(),
            sender: new.sender,
            content: new.content.clone(),
            created_at: new.created_at,
        };
        queries::messages::insert_message(&self.db, &message).await?;
        Ok(message)
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, ReceptaError> {
        queries::messages::messages_for_conversation(&self.db, conversation_id).await
    }
}
