//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use convene_shared::{
    CategoryId, ConversationId, ConversationStatus, EventId, EventImageId, MessageId, ReviewId,
    UserId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique, compared case-insensitively.
    pub email: String,
    /// Opaque hash produced by the authentication layer.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub icon: String,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A hosted event and its attendance counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub max_attendees: u32,
    /// Running count of confirmed conversations.  Only conversation status
    /// transitions change it.
    pub confirmed_attendees: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub organizer_id: UserId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn available_spots(&self) -> u32 {
        self.max_attendees.saturating_sub(self.confirmed_attendees)
    }

    pub fn is_full(&self) -> bool {
        self.available_spots() == 0
    }

    pub fn full_address(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.street, self.city, self.state, self.postal_code
        )
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.start_date >= today
    }

    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }
}

/// Filter for event listings.  `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Only events starting on or after this date.
    pub starts_on_or_after: Option<NaiveDate>,
    /// Only events that ended strictly before this date.
    pub ended_before: Option<NaiveDate>,
    /// Case-insensitive substring match on the city.
    pub city: Option<String>,
    /// Case-insensitive substring match on the state.
    pub state: Option<String>,
    pub category_id: Option<CategoryId>,
    pub organizer_id: Option<UserId>,
    pub include_inactive: bool,
}

// ---------------------------------------------------------------------------
// Event image
// ---------------------------------------------------------------------------

/// Metadata of an image attached to an event.  The bytes are fetched
/// separately with [`Database::get_event_image_data`].
///
/// [`Database::get_event_image_data`]: crate::Database::get_event_image_data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventImage {
    pub id: EventImageId,
    pub event_id: EventId,
    /// BLAKE3 hash of the image bytes (hex string).
    pub content_hash: String,
    pub size: i64,
    pub caption: String,
    pub is_primary: bool,
    pub uploaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// One request thread per (event, attendee, host).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub event_id: EventId,
    /// The attendee who opened the request.
    pub user_id: UserId,
    /// The event organizer captured when the thread was created.
    pub host_id: UserId,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn is_participant(&self, user: UserId) -> bool {
        self.user_id == user || self.host_id == user
    }
}

/// A conversation joined with the names around it and its message counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationOverview {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub event_title: String,
    pub user_name: String,
    pub host_name: String,
    pub message_count: u32,
    /// Messages addressed to the viewer that are still unread.  Zero when the
    /// overview was not built for a particular viewer.
    pub unread_count: u32,
    pub last_message: Option<Message>,
}

/// A participant of an event as seen through their conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventParticipant {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub requested_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single message inside a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub event_id: EventId,
    pub host_id: UserId,
    pub reviewer_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mean rating and number of reviews over some slice of the reviews table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingStats {
    /// `None` when there are no reviews.
    pub average_rating: Option<f64>,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(max: u32, confirmed: u32) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            title: "Picnic".into(),
            description: String::new(),
            category_id: None,
            max_attendees: max,
            confirmed_attendees: confirmed,
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            street: "1 Park Lane".into(),
            city: "Lyon".into(),
            state: "ARA".into(),
            postal_code: "69001".into(),
            organizer_id: UserId::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn available_spots_never_negative() {
        assert_eq!(event(2, 0).available_spots(), 2);
        assert_eq!(event(2, 2).available_spots(), 0);
        assert_eq!(event(2, 3).available_spots(), 0);
        assert!(event(2, 3).is_full());
        assert!(!event(2, 1).is_full());
    }

    #[test]
    fn full_address_formatting() {
        assert_eq!(event(1, 0).full_address(), "1 Park Lane, Lyon, ARA 69001");
    }

    #[test]
    fn upcoming_and_past_relative_to_today() {
        let e = event(1, 0);
        let before = NaiveDate::from_ymd_opt(2026, 4, 30).unwrap();
        let during = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let after = NaiveDate::from_ymd_opt(2026, 5, 3).unwrap();

        assert!(e.is_upcoming(before));
        assert!(!e.is_upcoming(during));
        assert!(!e.is_past(during));
        assert!(e.is_past(after));
    }
}
