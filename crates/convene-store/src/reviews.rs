//! Review rows and rating aggregates.

use rusqlite::{params, OptionalExtension};

use convene_shared::{EventId, ReviewId, UserId};

use crate::columns;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{RatingStats, Review};

const REVIEW_COLUMNS: &str =
    "id, event_id, host_id, reviewer_id, rating, comment, created_at, updated_at";

impl Database {
    /// Insert a review.  A second review of the same event by the same
    /// reviewer yields [`StoreError::Conflict`].
    pub fn insert_review(&self, review: &Review) -> Result<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO reviews ({REVIEW_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    review.id.to_string(),
                    review.event_id.to_string(),
                    review.host_id.to_string(),
                    review.reviewer_id.to_string(),
                    review.rating,
                    review.comment,
                    columns::ts(&review.created_at),
                    columns::ts(&review.updated_at),
                ],
            )
            .map_err(StoreError::classify)?;
        Ok(())
    }

    pub fn get_review(&self, id: ReviewId) -> Result<Review> {
        self.conn()
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1"),
                params![id.to_string()],
                row_to_review,
            )
            .map_err(StoreError::classify)
    }

    pub fn find_review(&self, event_id: EventId, reviewer_id: UserId) -> Result<Option<Review>> {
        let found = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {REVIEW_COLUMNS} FROM reviews WHERE event_id = ?1 AND reviewer_id = ?2"
                ),
                params![event_id.to_string(), reviewer_id.to_string()],
                row_to_review,
            )
            .optional()?;
        Ok(found)
    }

    /// Persist rating, comment and `updated_at`.
    pub fn update_review(&self, review: &Review) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE reviews SET rating = ?1, comment = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                review.rating,
                review.comment,
                columns::ts(&review.updated_at),
                review.id.to_string(),
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM reviews WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    pub fn list_reviews_for_event(&self, event_id: EventId) -> Result<Vec<Review>> {
        self.query_reviews("event_id", &event_id.to_string())
    }

    pub fn list_reviews_for_host(&self, host_id: UserId) -> Result<Vec<Review>> {
        self.query_reviews("host_id", &host_id.to_string())
    }

    pub fn event_rating_stats(&self, event_id: EventId) -> Result<RatingStats> {
        self.rating_stats("event_id", &event_id.to_string())
    }

    pub fn host_rating_stats(&self, host_id: UserId) -> Result<RatingStats> {
        self.rating_stats("host_id", &host_id.to_string())
    }

    // `column` is always one of our own literals, never user input.
    fn query_reviews(&self, column: &str, key: &str) -> Result<Vec<Review>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE {column} = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![key], row_to_review)?;

        let mut reviews = Vec::new();
        for row in rows {
            reviews.push(row?);
        }
        Ok(reviews)
    }

    fn rating_stats(&self, column: &str, key: &str) -> Result<RatingStats> {
        let stats = self.conn().query_row(
            &format!("SELECT AVG(rating), COUNT(*) FROM reviews WHERE {column} = ?1"),
            params![key],
            |row| {
                Ok(RatingStats {
                    average_rating: row.get(0)?,
                    count: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }
}

fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: columns::id(row, 0)?,
        event_id: columns::id(row, 1)?,
        host_id: columns::id(row, 2)?,
        reviewer_id: columns::id(row, 3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: columns::instant(row, 6)?,
        updated_at: columns::instant(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::columns::stored;
    use crate::test_support::{event, seeded, user};

    fn review(event_id: EventId, host_id: UserId, reviewer_id: UserId, rating: u8) -> Review {
        let now = stored(Utc::now());
        Review {
            id: ReviewId::new(),
            event_id,
            host_id,
            reviewer_id,
            rating,
            comment: "great evening".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn one_review_per_event_and_reviewer() {
        let (db, host, guest, ev) = seeded();
        let r = review(ev.id, host.id, guest.id, 4);
        db.insert_review(&r).unwrap();

        assert_eq!(db.get_review(r.id).unwrap(), r);
        assert_eq!(db.find_review(ev.id, guest.id).unwrap(), Some(r));
        let err = db
            .insert_review(&review(ev.id, host.id, guest.id, 2))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn stats_aggregate_per_event_and_host() {
        let (db, host, guest, ev) = seeded();
        let other = user("Otto", "otto@example.com");
        db.insert_user(&other).unwrap();
        let second_event = event(host.id, 3);
        db.insert_event(&second_event).unwrap();

        assert_eq!(
            db.event_rating_stats(ev.id).unwrap(),
            RatingStats {
                average_rating: None,
                count: 0
            }
        );

        db.insert_review(&review(ev.id, host.id, guest.id, 5)).unwrap();
        db.insert_review(&review(ev.id, host.id, other.id, 4)).unwrap();
        db.insert_review(&review(second_event.id, host.id, guest.id, 3))
            .unwrap();

        let per_event = db.event_rating_stats(ev.id).unwrap();
        assert_eq!(per_event.count, 2);
        assert_eq!(per_event.average_rating, Some(4.5));

        let per_host = db.host_rating_stats(host.id).unwrap();
        assert_eq!(per_host.count, 3);
        assert_eq!(per_host.average_rating, Some(4.0));

        assert_eq!(db.list_reviews_for_host(host.id).unwrap().len(), 3);
        assert_eq!(db.list_reviews_for_event(second_event.id).unwrap().len(), 1);
    }

    #[test]
    fn update_and_delete() {
        let (db, host, guest, ev) = seeded();
        let mut r = review(ev.id, host.id, guest.id, 2);
        db.insert_review(&r).unwrap();

        r.rating = 3;
        r.comment = "better on reflection".into();
        assert!(db.update_review(&r).unwrap());
        assert_eq!(db.get_review(r.id).unwrap().rating, 3);

        assert!(db.delete_review(r.id).unwrap());
        assert!(!db.delete_review(r.id).unwrap());
        assert!(matches!(db.get_review(r.id), Err(StoreError::NotFound)));
    }
}
