// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations keyed on the peer's external id.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use recepta_core::ReceptaError;

use crate::database::{Database, map_tr_err};
use crate::models::{Conversation, ConversationDefaults};
use crate::queries::{format_ts, parse_ts};

const CONVERSATION_COLUMNS: &str = "id, external_id, display_name, phone_number, status,
     last_message, last_message_at, created_at, updated_at";

fn conversation_from_row(row: &Row<'_>) -> Result<Conversation, rusqlite::Error> {
    let last_message_at: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Conversation {
        id: row.get(0)?,
        external_id: row.get(1)?,
        display_name: row.get(2)?,
        phone_number: row.get(3)?,
        status: row.get(4)?,
        last_message: row.get(5)?,
        last_message_at: last_message_at
            .map(|s| parse_ts(&s, 6))
            .transpose()?,
        created_at: parse_ts(&created_at, 7)?,
        updated_at: parse_ts(&updated_at, 8)?,
    })
}

/// Return the conversation for `external_id`, creating it with `defaults`
/// if absent.
///
/// Insert and read-back run in one transaction, so two concurrent upserts
/// for the same peer converge on a single row. Identity fields of an
/// existing row are never overwritten.
pub async fn upsert_conversation(
    db: &Database,
    external_id: &str,
    defaults: &ConversationDefaults,
) -> Result<Conversation, ReceptaError> {
    let external_id = external_id.to_string();
    let defaults = defaults.clone();
    let id = uuid::Uuid::new_v4().to_string();
    let now = format_ts(&Utc::now());

    db.connection()
        .call(move |conn| -> Result<Conversation, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations
                     (id, external_id, display_name, phone_number, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'active', ?5, ?5)
                 ON CONFLICT(external_id) DO NOTHING",
                params![
                    id,
                    external_id,
                    defaults.display_name,
                    defaults.phone_number,
                    now
                ],
            )?;

            let conversation = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE external_id = ?1"
                ))?;
                stmt.query_row(params![external_id], conversation_from_row)?
            };
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a conversation by external id, if it exists.
pub async fn get_conversation(
    db: &Database,
    external_id: &str,
) -> Result<Option<Conversation>, ReceptaError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE external_id = ?1"
            ))?;
            match stmt.query_row(params![external_id], conversation_from_row) {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Update a conversation's last-message preview and timestamp.
pub async fn touch_conversation(
    db: &Database,
    id: &str,
    last_message: &str,
    at: DateTime<Utc>,
) -> Result<(), ReceptaError> {
    let id = id.to_string();
    let last_message = last_message.to_string();
    let at = format_ts(&at);

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE conversations
                 SET last_message = ?1, last_message_at = ?2, updated_at = ?2
                 WHERE id = ?3",
                params![last_message, at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
