//! Image attachments of events.  Bytes live in the `data` BLOB column and are
//! only loaded on demand.

use chrono::{DateTime, Utc};
use rusqlite::params;

use convene_shared::{EventId, EventImageId};

use crate::columns;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::EventImage;

const IMAGE_COLUMNS: &str =
    "id, event_id, content_hash, length(data), caption, is_primary, uploaded_at";

impl Database {
    /// Store `data` for `event_id`.
    ///
    /// The image becomes primary when the event has no primary image yet.
    /// Callers wanting that decision to be race free wrap the call in
    /// [`Database::immediate`].
    pub fn insert_event_image(
        &self,
        event_id: EventId,
        data: &[u8],
        caption: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<EventImage> {
        let is_primary = !self.has_primary_image(event_id)?;
        let image = EventImage {
            id: EventImageId::new(),
            event_id,
            content_hash: blake3::hash(data).to_hex().to_string(),
            size: data.len() as i64,
            caption: caption.to_string(),
            is_primary,
            uploaded_at,
        };

        self.conn()
            .execute(
                "INSERT INTO event_images
                     (id, event_id, data, content_hash, caption, is_primary, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    image.id.to_string(),
                    event_id.to_string(),
                    data,
                    image.content_hash,
                    image.caption,
                    image.is_primary as i32,
                    columns::ts(&uploaded_at),
                ],
            )
            .map_err(StoreError::classify)?;

        tracing::debug!(
            event = %event_id,
            image = %image.id,
            bytes = data.len(),
            primary = image.is_primary,
            "event image stored"
        );
        Ok(image)
    }

    /// Images of an event, primary first, then in upload order.
    pub fn list_event_images(&self, event_id: EventId) -> Result<Vec<EventImage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {IMAGE_COLUMNS} FROM event_images
             WHERE event_id = ?1
             ORDER BY is_primary DESC, uploaded_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![event_id.to_string()], row_to_image)?;

        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }
        Ok(images)
    }

    /// Raw bytes of one image, scoped to its event.
    pub fn get_event_image_data(
        &self,
        event_id: EventId,
        image_id: EventImageId,
    ) -> Result<Vec<u8>> {
        self.conn()
            .query_row(
                "SELECT data FROM event_images WHERE id = ?1 AND event_id = ?2",
                params![image_id.to_string(), event_id.to_string()],
                |row| row.get(0),
            )
            .map_err(StoreError::classify)
    }

    pub fn has_primary_image(&self, event_id: EventId) -> Result<bool> {
        let exists: i64 = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM event_images WHERE event_id = ?1 AND is_primary = 1)",
            params![event_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventImage> {
    Ok(EventImage {
        id: columns::id(row, 0)?,
        event_id: columns::id(row, 1)?,
        content_hash: row.get(2)?,
        size: row.get(3)?,
        caption: row.get(4)?,
        is_primary: columns::flag(row, 5)?,
        uploaded_at: columns::instant(row, 6)?,
    })
}
