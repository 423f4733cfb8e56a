// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations. Messages are immutable once inserted.

use std::str::FromStr;

use rusqlite::{Row, params};

use recepta_core::ReceptaError;

use crate::database::{Database, map_tr_err};
use crate::models::{Message, Sender};
use crate::queries::{format_ts, parse_ts};

fn message_from_row(row: &Row<'_>) -> Result<Message, rusqlite::Error> {
    let sender: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    Ok(Message {
        id: row.get(0)?,
        external_id: row.get(1)?,
        conversation_id: row.get(2)?,
        sender: Sender::from_str(&sender).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        content: row.get(4)?,
        created_at: parse_ts(&created_at, 5)?,
    })
}

/// Insert a fully formed message record.
pub async fn insert_message(db: &Database, message: &Message) -> Result<(), ReceptaError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages
                     (id, external_id, conversation_id, sender, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id,
                    message.external_id,
                    message.conversation_id,
                    message.sender.to_string(),
                    message.content,
                    format_ts(&message.created_at)
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List a conversation's messages ordered by creation time ascending.
///
/// Rowid breaks ties for messages created within the same millisecond.
pub async fn messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, ReceptaError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, external_id, conversation_id, sender, content, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
