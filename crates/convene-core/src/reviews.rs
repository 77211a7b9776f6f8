//! The review ledger.
//!
//! A user may review an event when they are not its organizer, have not
//! reviewed it yet and, with `review_requires_confirmation` on, hold a
//! confirmed conversation for it.

use serde::Deserialize;
use tracing::info;

use convene_shared::constants::{RATING_MAX, RATING_MIN};
use convene_shared::{ConversationStatus, EventId, ReviewId, UserId};
use convene_store::{Database, Event, RatingStats, Review};

use crate::error::{CoreError, OrNotFound, Result};
use crate::Engine;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

fn check_rating(rating: u8) -> Result<()> {
    if !(RATING_MIN..=RATING_MAX).contains(&rating) {
        return Err(CoreError::Validation(format!(
            "rating must be between {RATING_MIN} and {RATING_MAX}"
        )));
    }
    Ok(())
}

fn owned_review(db: &Database, review_id: ReviewId, reviewer: UserId) -> Result<Review> {
    let review = db.get_review(review_id).or_not_found("review")?;
    if review.reviewer_id != reviewer {
        return Err(CoreError::Authorization(
            "only the author may change a review".into(),
        ));
    }
    Ok(review)
}

/// What stops a user from reviewing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Obstacle {
    Organizer,
    AlreadyReviewed,
    NotConfirmed,
}

impl From<Obstacle> for CoreError {
    fn from(obstacle: Obstacle) -> Self {
        match obstacle {
            Obstacle::Organizer => {
                CoreError::Authorization("organizers cannot review their own event".into())
            }
            Obstacle::AlreadyReviewed => CoreError::Conflict("event already reviewed".into()),
            Obstacle::NotConfirmed => {
                CoreError::Authorization("only confirmed attendees may review".into())
            }
        }
    }
}

fn review_obstacle(
    db: &Database,
    event: &Event,
    user: UserId,
    requires_confirmation: bool,
) -> Result<Option<Obstacle>> {
    if event.organizer_id == user {
        return Ok(Some(Obstacle::Organizer));
    }
    if db.find_review(event.id, user)?.is_some() {
        return Ok(Some(Obstacle::AlreadyReviewed));
    }
    if requires_confirmation {
        let confirmed = db
            .find_conversation_for_participant(event.id, user)?
            .is_some_and(|c| c.user_id == user && c.status == ConversationStatus::Confirmed);
        if !confirmed {
            return Ok(Some(Obstacle::NotConfirmed));
        }
    }
    Ok(None)
}

impl Engine {
    pub fn create_review(
        &self,
        event_id: EventId,
        reviewer: UserId,
        rating: u8,
        comment: &str,
    ) -> Result<Review> {
        check_rating(rating)?;
        let requires_confirmation = self.policy.review_requires_confirmation;

        self.db.immediate(|db| {
            let event = db.get_event(event_id).or_not_found("event")?;
            db.get_user(reviewer).or_not_found("user")?;

            if let Some(obstacle) = review_obstacle(db, &event, reviewer, requires_confirmation)? {
                return Err(CoreError::from(obstacle));
            }

            let now = convene_store::now();
            let review = Review {
                id: ReviewId::new(),
                event_id: event.id,
                host_id: event.organizer_id,
                reviewer_id: reviewer,
                rating,
                comment: comment.trim().to_string(),
                created_at: now,
                updated_at: now,
            };
            db.insert_review(&review)?;

            info!(review = %review.id, event = %event.id, rating, "review created");
            Ok(review)
        })
    }

    pub fn update_review(
        &self,
        review_id: ReviewId,
        reviewer: UserId,
        update: ReviewUpdate,
    ) -> Result<Review> {
        if let Some(rating) = update.rating {
            check_rating(rating)?;
        }

        self.db.immediate(|db| {
            let mut review = owned_review(db, review_id, reviewer)?;
            if let Some(rating) = update.rating {
                review.rating = rating;
            }
            if let Some(comment) = update.comment {
                review.comment = comment.trim().to_string();
            }
            review.updated_at = convene_store::now();
            db.update_review(&review)?;

            info!(review = %review.id, "review updated");
            Ok(review)
        })
    }

    pub fn delete_review(&self, review_id: ReviewId, reviewer: UserId) -> Result<()> {
        self.db.immediate(|db| {
            let review = owned_review(db, review_id, reviewer)?;
            db.delete_review(review.id)?;
            info!(review = %review.id, "review deleted");
            Ok(())
        })
    }

    pub fn can_review(&self, event_id: EventId, user: UserId) -> Result<bool> {
        let event = self.db.get_event(event_id).or_not_found("event")?;
        let obstacle = review_obstacle(
            &self.db,
            &event,
            user,
            self.policy.review_requires_confirmation,
        )?;
        Ok(obstacle.is_none())
    }

    pub fn event_rating_stats(&self, event_id: EventId) -> Result<RatingStats> {
        self.db.get_event(event_id).or_not_found("event")?;
        Ok(self.db.event_rating_stats(event_id)?)
    }

    pub fn host_rating_stats(&self, host_id: UserId) -> Result<RatingStats> {
        self.db.get_user(host_id).or_not_found("user")?;
        Ok(self.db.host_rating_stats(host_id)?)
    }

    pub fn reviews_for_event(&self, event_id: EventId) -> Result<Vec<Review>> {
        self.db.get_event(event_id).or_not_found("event")?;
        Ok(self.db.list_reviews_for_event(event_id)?)
    }

    pub fn reviews_for_host(&self, host_id: UserId) -> Result<Vec<Review>> {
        self.db.get_user(host_id).or_not_found("user")?;
        Ok(self.db.list_reviews_for_host(host_id)?)
    }
}

#[cfg(test)]
mod tests {
    use convene_store::User;

    use super::*;
    use crate::test_support::{engine, host_event, register};
    use crate::Policy;

    fn confirmed_guest(engine: &Engine, host: &User, event: &Event, name: &str) -> User {
        let guest = register(engine, name);
        let c = engine
            .submit_request(event.id, guest.id, "Hi")
            .unwrap()
            .conversation;
        engine
            .transition_status(c.id, host.id, ConversationStatus::Confirmed)
            .unwrap();
        guest
    }

    #[test]
    fn eligibility_rules() {
        let engine = engine();
        let host = register(&engine, "Hana");
        let event = host_event(&engine, &host, 10);
        let pending = register(&engine, "Pat");
        engine.submit_request(event.id, pending.id, "Hi").unwrap();
        let guest = confirmed_guest(&engine, &host, &event, "Gus");

        assert!(!engine.can_review(event.id, host.id).unwrap());
        assert!(!engine.can_review(event.id, pending.id).unwrap());
        assert!(engine.can_review(event.id, guest.id).unwrap());

        engine.create_review(event.id, guest.id, 5, "Loved it").unwrap();
        assert!(!engine.can_review(event.id, guest.id).unwrap());
    }

    #[test]
    fn create_maps_obstacles_to_errors() {
        let engine = engine();
        let host = register(&engine, "Hana");
        let event = host_event(&engine, &host, 10);
        let guest = confirmed_guest(&engine, &host, &event, "Gus");
        let stranger = register(&engine, "Stan");

        assert!(matches!(
            engine.create_review(event.id, guest.id, 6, ""),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            engine.create_review(event.id, stranger.id, 4, ""),
            Err(CoreError::Authorization(_))
        ));
        assert!(matches!(
            engine.create_review(event.id, host.id, 4, ""),
            Err(CoreError::Authorization(_))
        ));

        let review = engine.create_review(event.id, guest.id, 4, " fun ").unwrap();
        assert_eq!(review.host_id, host.id);
        assert_eq!(review.comment, "fun");
        assert!(matches!(
            engine.create_review(event.id, guest.id, 3, ""),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn confirmation_requirement_can_be_disabled() {
        let engine = Engine::open_in_memory(Policy {
            review_requires_confirmation: false,
            ..Policy::default()
        })
        .unwrap();
        let host = register(&engine, "Hana");
        let event = host_event(&engine, &host, 10);
        let stranger = register(&engine, "Stan");

        assert!(engine.can_review(event.id, stranger.id).unwrap());
        engine.create_review(event.id, stranger.id, 3, "").unwrap();
    }

    #[test]
    fn only_the_author_edits_or_deletes() {
        let engine = engine();
        let host = register(&engine, "Hana");
        let event = host_event(&engine, &host, 10);
        let guest = confirmed_guest(&engine, &host, &event, "Gus");
        let review = engine.create_review(event.id, guest.id, 2, "meh").unwrap();

        assert!(matches!(
            engine.update_review(review.id, host.id, ReviewUpdate::default()),
            Err(CoreError::Authorization(_))
        ));
        let updated = engine
            .update_review(
                review.id,
                guest.id,
                ReviewUpdate {
                    rating: Some(4),
                    comment: None,
                },
            )
            .unwrap();
        assert_eq!(updated.rating, 4);
        assert_eq!(updated.comment, "meh");

        assert!(matches!(
            engine.delete_review(review.id, host.id),
            Err(CoreError::Authorization(_))
        ));
        engine.delete_review(review.id, guest.id).unwrap();
        assert!(engine.reviews_for_event(event.id).unwrap().is_empty());
    }

    #[test]
    fn stats_per_event_and_host() {
        let engine = engine();
        let host = register(&engine, "Hana");
        let first = host_event(&engine, &host, 10);
        let second = host_event(&engine, &host, 10);

        let a = confirmed_guest(&engine, &host, &first, "Ann");
        let b = confirmed_guest(&engine, &host, &first, "Ben");
        engine.create_review(first.id, a.id, 5, "").unwrap();
        engine.create_review(first.id, b.id, 3, "").unwrap();

        let c = confirmed_guest(&engine, &host, &second, "Cid");
        engine.create_review(second.id, c.id, 1, "").unwrap();

        let per_event = engine.event_rating_stats(first.id).unwrap();
        assert_eq!(per_event.count, 2);
        assert_eq!(per_event.average_rating, Some(4.0));

        let per_host = engine.host_rating_stats(host.id).unwrap();
        assert_eq!(per_host.count, 3);
        assert_eq!(per_host.average_rating, Some(3.0));
        assert_eq!(engine.reviews_for_host(host.id).unwrap().len(), 3);

        let empty = engine.event_rating_stats(host_event(&engine, &host, 1).id).unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.average_rating.is_none());
    }
}
