//! Categories, events and their images.
//!
//! Events are written by their organizer only.  The confirmed-attendee
//! counter is never touched here; it belongs to the conversation engine.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use convene_shared::constants::{MAX_ATTENDEES, MAX_IMAGES_PER_UPLOAD, MIN_ATTENDEES};
use convene_shared::{CategoryId, EventId, EventImageId, EventWindow, UserId};
use convene_store::{Category, Database, Event, EventImage, EventQuery};

use crate::error::{CoreError, OrNotFound, Result};
use crate::Engine;

/// Editable fields of an event, as supplied on create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub max_attendees: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    #[serde(default)]
    pub when: EventWindow,
    pub city: Option<String>,
    pub state: Option<String>,
    pub category_id: Option<CategoryId>,
    pub organizer_id: Option<UserId>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub data: Vec<u8>,
    pub caption: String,
}

/// An event with its derived attendance fields and image metadata.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub available_spots: u32,
    pub is_full: bool,
    pub full_address: String,
    pub images: Vec<EventImage>,
}

impl EventDetails {
    pub fn new(event: Event, images: Vec<EventImage>) -> Self {
        Self {
            available_spots: event.available_spots(),
            is_full: event.is_full(),
            full_address: event.full_address(),
            event,
            images,
        }
    }
}

impl EventDraft {
    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation("title must not be empty".into()));
        }
        if !(MIN_ATTENDEES..=MAX_ATTENDEES).contains(&self.max_attendees) {
            return Err(CoreError::Validation(format!(
                "max_attendees must be between {MIN_ATTENDEES} and {MAX_ATTENDEES}"
            )));
        }
        if self.end_date < self.start_date {
            return Err(CoreError::Validation(
                "end_date must not be before start_date".into(),
            ));
        }
        Ok(())
    }

    fn apply_to(self, event: &mut Event) {
        event.title = self.title.trim().to_string();
        event.description = self.description;
        event.category_id = self.category_id;
        event.max_attendees = self.max_attendees;
        event.start_date = self.start_date;
        event.end_date = self.end_date;
        event.start_time = self.start_time;
        event.end_time = self.end_time;
        event.street = self.street;
        event.city = self.city;
        event.state = self.state;
        event.postal_code = self.postal_code;
    }
}

fn ensure_organizer(event: &Event, actor: UserId) -> Result<()> {
    if event.organizer_id != actor {
        warn!(event = %event.id, actor = %actor, "non-organizer tried to modify event");
        return Err(CoreError::Authorization(
            "only the organizer may modify this event".into(),
        ));
    }
    Ok(())
}

fn store_images(
    db: &Database,
    event_id: EventId,
    images: &[NewImage],
    now: DateTime<Utc>,
) -> Result<Vec<EventImage>> {
    let mut stored = Vec::with_capacity(images.len());
    for image in images {
        stored.push(db.insert_event_image(event_id, &image.data, &image.caption, now)?);
    }
    Ok(stored)
}

impl Engine {
    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub fn create_category(&self, name: &str, description: &str, icon: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("category name must not be empty".into()));
        }
        let category = Category {
            id: CategoryId::new(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        };
        self.db.insert_category(&category)?;
        info!(category = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.db.list_categories()?)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn create_event(&self, organizer: UserId, draft: EventDraft) -> Result<Event> {
        self.create_event_with_images(organizer, draft, Vec::new())
            .map(|details| details.event)
    }

    /// Create an event and store `images` with it in one transaction.  When
    /// the draft or any image is rejected nothing is written.
    pub fn create_event_with_images(
        &self,
        organizer: UserId,
        draft: EventDraft,
        images: Vec<NewImage>,
    ) -> Result<EventDetails> {
        draft.validate()?;
        if !images.is_empty() {
            self.check_images(&images)?;
        }

        self.db.immediate(|db| {
            db.get_user(organizer).or_not_found("user")?;
            if let Some(category) = draft.category_id {
                db.get_category(category).or_not_found("category")?;
            }

            let now = convene_store::now();
            let mut event = Event {
                id: EventId::new(),
                title: String::new(),
                description: String::new(),
                category_id: None,
                max_attendees: draft.max_attendees,
                confirmed_attendees: 0,
                start_date: draft.start_date,
                end_date: draft.end_date,
                start_time: draft.start_time,
                end_time: draft.end_time,
                street: String::new(),
                city: String::new(),
                state: String::new(),
                postal_code: String::new(),
                organizer_id: organizer,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            draft.apply_to(&mut event);
            db.insert_event(&event)?;

            let stored = store_images(db, event.id, &images, now)?;
            info!(
                event = %event.id,
                organizer = %organizer,
                images = stored.len(),
                "event created"
            );
            Ok(EventDetails::new(event, stored))
        })
    }

    pub fn get_event(&self, id: EventId) -> Result<EventDetails> {
        let event = self.db.get_event(id).or_not_found("event")?;
        let images = self.db.list_event_images(id)?;
        Ok(EventDetails::new(event, images))
    }

    /// Events matching `filter`, soonest first.  Upcoming and past are
    /// relative to today's UTC date.
    pub fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventDetails>> {
        let today = Utc::now().date_naive();
        let mut query = EventQuery {
            city: filter.city.clone().filter(|s| !s.trim().is_empty()),
            state: filter.state.clone().filter(|s| !s.trim().is_empty()),
            category_id: filter.category_id,
            organizer_id: filter.organizer_id,
            include_inactive: filter.include_inactive,
            ..Default::default()
        };
        match filter.when {
            EventWindow::All => {}
            EventWindow::Upcoming => query.starts_on_or_after = Some(today),
            EventWindow::Past => query.ended_before = Some(today),
        }

        let events = self.db.list_events(&query)?;
        debug!(count = events.len(), "events listed");

        events
            .into_iter()
            .map(|event| -> Result<EventDetails> {
                let images = self.db.list_event_images(event.id)?;
                Ok(EventDetails::new(event, images))
            })
            .collect()
    }

    pub fn update_event(&self, id: EventId, actor: UserId, draft: EventDraft) -> Result<Event> {
        draft.validate()?;

        self.db.immediate(|db| {
            let mut event = db.get_event(id).or_not_found("event")?;
            ensure_organizer(&event, actor)?;
            if let Some(category) = draft.category_id {
                db.get_category(category).or_not_found("category")?;
            }

            draft.apply_to(&mut event);
            event.updated_at = convene_store::now();
            db.update_event_details(&event)?;

            info!(event = %event.id, "event updated");
            Ok(event)
        })
    }

    /// Flip the active flag.
    pub fn toggle_event_active(&self, id: EventId, actor: UserId) -> Result<Event> {
        self.set_active(id, actor, None)
    }

    /// Soft-delete: the event stays readable by id but drops out of default
    /// listings.
    pub fn deactivate_event(&self, id: EventId, actor: UserId) -> Result<Event> {
        self.set_active(id, actor, Some(false))
    }

    fn set_active(&self, id: EventId, actor: UserId, target: Option<bool>) -> Result<Event> {
        self.db.immediate(|db| {
            let mut event = db.get_event(id).or_not_found("event")?;
            ensure_organizer(&event, actor)?;

            event.is_active = target.unwrap_or(!event.is_active);
            event.updated_at = convene_store::now();
            db.set_event_active(event.id, event.is_active, event.updated_at)?;

            info!(event = %event.id, active = event.is_active, "event active flag changed");
            Ok(event)
        })
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Attach up to [`MAX_IMAGES_PER_UPLOAD`] images.  All images are
    /// validated before any is stored.
    pub fn attach_images(
        &self,
        id: EventId,
        actor: UserId,
        images: Vec<NewImage>,
    ) -> Result<Vec<EventImage>> {
        if images.is_empty() {
            return Err(CoreError::Validation("no images supplied".into()));
        }
        self.check_images(&images)?;

        self.db.immediate(|db| {
            let event = db.get_event(id).or_not_found("event")?;
            ensure_organizer(&event, actor)?;

            let stored = store_images(db, event.id, &images, convene_store::now())?;
            info!(event = %event.id, count = stored.len(), "images attached");
            Ok(stored)
        })
    }

    fn check_images(&self, images: &[NewImage]) -> Result<()> {
        if images.len() > MAX_IMAGES_PER_UPLOAD {
            return Err(CoreError::Validation(format!(
                "at most {MAX_IMAGES_PER_UPLOAD} images per upload"
            )));
        }
        let limit = self.policy.max_image_size;
        for (idx, image) in images.iter().enumerate() {
            if image.data.is_empty() {
                return Err(CoreError::Validation(format!("image {idx} is empty")));
            }
            if image.data.len() > limit {
                return Err(CoreError::Validation(format!(
                    "image {idx} is {} bytes, the limit is {limit}",
                    image.data.len()
                )));
            }
        }
        Ok(())
    }

    pub fn event_images(&self, id: EventId) -> Result<Vec<EventImage>> {
        self.db.get_event(id).or_not_found("event")?;
        Ok(self.db.list_event_images(id)?)
    }

    pub fn event_image_data(&self, id: EventId, image_id: EventImageId) -> Result<Vec<u8>> {
        self.db.get_event_image_data(id, image_id).or_not_found("image")
    }
}
