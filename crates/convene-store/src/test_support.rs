//! Fixture builders for the store's unit tests.

use chrono::{NaiveDate, NaiveTime, Utc};

use convene_shared::{ConversationId, ConversationStatus, EventId, UserId};

use crate::columns::stored;
use crate::models::{Conversation, Event, User};

pub(crate) fn user(name: &str, email: &str) -> User {
    let now = stored(Utc::now());
    User {
        id: UserId::new(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "hash".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn event(organizer: UserId, max_attendees: u32) -> Event {
    let now = stored(Utc::now());
    Event {
        id: EventId::new(),
        title: "Board game night".to_string(),
        description: "Bring your favourite game".to_string(),
        category_id: None,
        max_attendees,
        confirmed_attendees: 0,
        start_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        street: "12 Rue Mercière".to_string(),
        city: "Lyon".to_string(),
        state: "ARA".to_string(),
        postal_code: "69002".to_string(),
        organizer_id: organizer,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn conversation(event: &Event, attendee: UserId) -> Conversation {
    let now = stored(Utc::now());
    Conversation {
        id: ConversationId::new(),
        event_id: event.id,
        user_id: attendee,
        host_id: event.organizer_id,
        status: ConversationStatus::Pending,
        created_at: now,
        updated_at: now,
        confirmed_at: None,
        rejected_at: None,
    }
}

/// A database holding one host, one attendee and one event of the host.
pub(crate) fn seeded() -> (crate::Database, User, User, Event) {
    let db = crate::Database::open_in_memory().unwrap();
    let host = user("Hana", "hana@example.com");
    let guest = user("Gus", "gus@example.com");
    db.insert_user(&host).unwrap();
    db.insert_user(&guest).unwrap();
    let ev = event(host.id, 10);
    db.insert_event(&ev).unwrap();
    (db, host, guest, ev)
}
