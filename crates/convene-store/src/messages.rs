//! Append-only message log with per-recipient read tracking.

use chrono::{DateTime, Utc};
use rusqlite::params;

use convene_shared::{ConversationId, MessageId, UserId};

use crate::columns;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Message;

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, text, is_read, read_at, created_at";

impl Database {
    pub fn insert_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Message> {
        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            text: text.to_string(),
            is_read: false,
            read_at: None,
            created_at,
        };

        self.conn()
            .execute(
                &format!(
                    "INSERT INTO messages ({MESSAGE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5)"
                ),
                params![
                    message.id.to_string(),
                    conversation_id.to_string(),
                    sender_id.to_string(),
                    message.text,
                    columns::ts(&created_at),
                ],
            )
            .map_err(StoreError::classify)?;
        Ok(message)
    }

    /// All messages of a conversation, oldest first.  Messages sharing a
    /// timestamp keep insertion order.
    pub fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![conversation_id.to_string()], |row| message_at(row, 0))?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn count_messages(&self, conversation_id: ConversationId) -> Result<u32> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mark every unread message of the conversation that `reader` did not
    /// send as read.  Returns how many rows changed.
    pub fn mark_messages_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let changed = self.conn().execute(
            "UPDATE messages SET is_read = 1, read_at = ?1
             WHERE conversation_id = ?2 AND sender_id != ?3 AND is_read = 0",
            params![
                columns::ts(&now),
                conversation_id.to_string(),
                reader.to_string()
            ],
        )?;
        Ok(changed)
    }
}

/// Decode a message whose columns start at `offset`, in
/// `MESSAGE_COLUMNS` order.
pub(crate) fn message_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Message> {
    Ok(Message {
        id: columns::id(row, offset)?,
        conversation_id: columns::id(row, offset + 1)?,
        sender_id: columns::id(row, offset + 2)?,
        text: row.get(offset + 3)?,
        is_read: columns::flag(row, offset + 4)?,
        read_at: columns::opt_instant(row, offset + 5)?,
        created_at: columns::instant(row, offset + 6)?,
    })
}
