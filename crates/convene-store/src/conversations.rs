//! Conversation rows and the joined overviews built on top of them.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use convene_shared::{ConversationId, ConversationStatus, EventId, UserId};

use crate::columns;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::message_at;
use crate::models::{Conversation, ConversationOverview, EventParticipant};

const CONVERSATION_COLUMNS: &str =
    "id, event_id, user_id, host_id, status, created_at, updated_at, confirmed_at, rejected_at";

/// Overview query.  `?1` is always the viewer whose unread messages are
/// counted; the caller appends a WHERE and ORDER BY clause.
const OVERVIEW_SELECT: &str = "
    SELECT c.id, c.event_id, c.user_id, c.host_id, c.status,
           c.created_at, c.updated_at, c.confirmed_at, c.rejected_at,
           e.title, u.name, h.name,
           (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id),
           (SELECT COUNT(*) FROM messages m
             WHERE m.conversation_id = c.id AND m.is_read = 0 AND m.sender_id != ?1),
           lm.id, lm.conversation_id, lm.sender_id, lm.text, lm.is_read, lm.read_at, lm.created_at
    FROM conversations c
    JOIN events e ON e.id = c.event_id
    JOIN users u ON u.id = c.user_id
    JOIN users h ON h.id = c.host_id
    LEFT JOIN messages lm ON lm.rowid = (
        SELECT m.rowid FROM messages m
        WHERE m.conversation_id = c.id
        ORDER BY m.created_at DESC, m.rowid DESC
        LIMIT 1
    )";

impl Database {
    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert a new conversation.  A second thread for the same
    /// (event, user, host) triple yields [`StoreError::Conflict`].
    pub fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO conversations ({CONVERSATION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    conversation.id.to_string(),
                    conversation.event_id.to_string(),
                    conversation.user_id.to_string(),
                    conversation.host_id.to_string(),
                    conversation.status.as_str(),
                    columns::ts(&conversation.created_at),
                    columns::ts(&conversation.updated_at),
                    conversation.confirmed_at.as_ref().map(columns::ts),
                    conversation.rejected_at.as_ref().map(columns::ts),
                ],
            )
            .map_err(StoreError::classify)?;
        Ok(())
    }

    /// Persist the status and decision stamps of `conversation`.
    pub fn update_conversation_state(&self, conversation: &Conversation) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE conversations
             SET status = ?1, updated_at = ?2, confirmed_at = ?3, rejected_at = ?4
             WHERE id = ?5",
            params![
                conversation.status.as_str(),
                columns::ts(&conversation.updated_at),
                conversation.confirmed_at.as_ref().map(columns::ts),
                conversation.rejected_at.as_ref().map(columns::ts),
                conversation.id.to_string(),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Bump `updated_at` after activity on the thread.
    pub fn touch_conversation(&self, id: ConversationId, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![columns::ts(&now), id.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Plain reads
    // ------------------------------------------------------------------

    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.conn()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id.to_string()],
                row_to_conversation,
            )
            .map_err(StoreError::classify)
    }

    /// The thread of `event_id` in which `participant` takes part, as
    /// attendee or as host.
    ///
    /// One query covers both roles.  An attendee-role match wins over a
    /// host-role match, then the most recently updated thread.
    pub fn find_conversation_for_participant(
        &self,
        event_id: EventId,
        participant: UserId,
    ) -> Result<Option<Conversation>> {
        let found = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE event_id = ?1 AND (user_id = ?2 OR host_id = ?2)
                     ORDER BY (user_id = ?2) DESC, updated_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![event_id.to_string(), participant.to_string()],
                row_to_conversation,
            )
            .optional()?;
        Ok(found)
    }

    /// Confirmed threads of an attendee, most recent confirmation first.
    pub fn list_confirmed_conversations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE user_id = ?1 AND status = 'confirmed'
             ORDER BY confirmed_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user_id.to_string()], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(row?);
        }
        Ok(conversations)
    }

    /// Attendees of an event whose thread is in `status`, oldest request
    /// first.
    pub fn list_event_participants(
        &self,
        event_id: EventId,
        status: ConversationStatus,
    ) -> Result<Vec<EventParticipant>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.id, c.user_id, u.name, u.email, c.created_at, c.confirmed_at
             FROM conversations c
             JOIN users u ON u.id = c.user_id
             WHERE c.event_id = ?1 AND c.status = ?2
             ORDER BY c.created_at ASC, c.rowid ASC",
        )?;
        let rows = stmt.query_map(params![event_id.to_string(), status.as_str()], |row| {
            Ok(EventParticipant {
                conversation_id: columns::id(row, 0)?,
                user_id: columns::id(row, 1)?,
                user_name: row.get(2)?,
                user_email: row.get(3)?,
                requested_at: columns::instant(row, 4)?,
                confirmed_at: columns::opt_instant(row, 5)?,
            })
        })?;

        let mut participants = Vec::new();
        for row in rows {
            participants.push(row?);
        }
        Ok(participants)
    }

    // ------------------------------------------------------------------
    // Overviews
    // ------------------------------------------------------------------

    /// One conversation with names, counters and its latest message.
    pub fn get_conversation_overview(
        &self,
        id: ConversationId,
        viewer: UserId,
    ) -> Result<ConversationOverview> {
        self.conn()
            .query_row(
                &format!("{OVERVIEW_SELECT} WHERE c.id = ?2"),
                params![viewer.to_string(), id.to_string()],
                row_to_overview,
            )
            .map_err(StoreError::classify)
    }

    /// Every thread the user takes part in, most recent activity first.
    ///
    /// Activity is the latest message time, or the creation time of a
    /// thread without messages.
    pub fn list_conversation_overviews_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationOverview>> {
        self.query_overviews(
            &format!(
                "{OVERVIEW_SELECT}
                 WHERE c.user_id = ?1 OR c.host_id = ?1
                 ORDER BY COALESCE(lm.created_at, c.created_at) DESC, lm.rowid DESC, c.rowid DESC"
            ),
            params![user_id.to_string()],
        )
    }

    /// Every thread of an event, most recently updated first.  Unread
    /// counters are computed for `viewer`.
    pub fn list_conversation_overviews_for_event(
        &self,
        event_id: EventId,
        viewer: UserId,
    ) -> Result<Vec<ConversationOverview>> {
        self.query_overviews(
            &format!(
                "{OVERVIEW_SELECT}
                 WHERE c.event_id = ?2
                 ORDER BY c.updated_at DESC, c.rowid DESC"
            ),
            params![viewer.to_string(), event_id.to_string()],
        )
    }

    fn query_overviews(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ConversationOverview>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(params, row_to_overview)?;

        let mut overviews = Vec::new();
        for row in rows {
            overviews.push(row?);
        }
        Ok(overviews)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn status_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<ConversationStatus> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: columns::id(row, 0)?,
        event_id: columns::id(row, 1)?,
        user_id: columns::id(row, 2)?,
        host_id: columns::id(row, 3)?,
        status: status_at(row, 4)?,
        created_at: columns::instant(row, 5)?,
        updated_at: columns::instant(row, 6)?,
        confirmed_at: columns::opt_instant(row, 7)?,
        rejected_at: columns::opt_instant(row, 8)?,
    })
}

fn row_to_overview(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationOverview> {
    let last_id: Option<String> = row.get(14)?;
    let last_message = match last_id {
        Some(_) => Some(message_at(row, 14)?),
        None => None,
    };

    Ok(ConversationOverview {
        conversation: row_to_conversation(row)?,
        event_title: row.get(9)?,
        user_name: row.get(10)?,
        host_name: row.get(11)?,
        message_count: row.get(12)?,
        unread_count: row.get(13)?,
        last_message,
    })
}
