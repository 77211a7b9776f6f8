//! The conversation engine.
//!
//! A conversation is the request thread between an attendee and the host of
//! an event.  Submitting a request finds or opens the thread and appends a
//! message; the host's decisions move the thread between `pending`,
//! `confirmed` and `rejected` and keep the event's confirmed-attendee counter
//! in step.
//!
//! Each mutating operation runs in one `BEGIN IMMEDIATE` transaction, and the
//! counter moves through SQL arithmetic on the event row, so concurrent
//! engines on the same database file never lose an update.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use convene_shared::{ConversationId, ConversationStatus, EventId, Role, UserId};
use convene_store::{
    Conversation, ConversationOverview, Database, Event, EventImage, EventParticipant, Message,
    StoreError,
};

use crate::error::{CoreError, OrNotFound, Result};
use crate::messages::message_text;
use crate::Engine;

/// Result of [`Engine::submit_request`].
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub conversation: Conversation,
    pub message: Message,
    pub is_new_conversation: bool,
    pub message_count: u32,
}

/// Attendance fields of an event after a decision.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventCapacity {
    pub id: EventId,
    pub title: String,
    pub max_attendees: u32,
    pub confirmed_attendees: u32,
    pub available_spots: u32,
    pub is_full: bool,
}

impl From<&Event> for EventCapacity {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            max_attendees: event.max_attendees,
            confirmed_attendees: event.confirmed_attendees,
            available_spots: event.available_spots(),
            is_full: event.is_full(),
        }
    }
}

/// Result of [`Engine::transition_status`].
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub conversation: Conversation,
    pub event: EventCapacity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// The other participant of a conversation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Counterpart {
    pub id: UserId,
    pub name: String,
}

/// A conversation as listed for one of its participants.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub overview: ConversationOverview,
    pub role: Role,
    pub counterpart: Counterpart,
}

impl ConversationSummary {
    fn for_viewer(overview: ConversationOverview, viewer: UserId) -> Self {
        let c = &overview.conversation;
        let (role, counterpart) = if c.user_id == viewer {
            (
                Role::Attendee,
                Counterpart {
                    id: c.host_id,
                    name: overview.host_name.clone(),
                },
            )
        } else {
            (
                Role::Host,
                Counterpart {
                    id: c.user_id,
                    name: overview.user_name.clone(),
                },
            )
        };
        Self {
            overview,
            role,
            counterpart,
        }
    }
}

/// Result of [`Engine::list_for_event`].
#[derive(Debug, Clone, Serialize)]
pub struct EventConversations {
    pub event: EventCapacity,
    pub conversations: Vec<ConversationOverview>,
}

/// One event the user is confirmed for, with everyone else around it.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedEvent {
    pub event: EventCapacity,
    pub details: Event,
    pub organizer: Counterpart,
    pub images: Vec<EventImage>,
    pub participants: Vec<EventParticipant>,
    pub pending_requests: Vec<EventParticipant>,
    pub conversation_id: ConversationId,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Engine {
    /// Ask to join an event, or add to an existing request thread.
    ///
    /// The thread is looked up in one query covering both roles of the
    /// requester, preferring the one where they are the attendee.  Without a
    /// thread a new pending one is opened with the event's organizer as host.
    pub fn submit_request(
        &self,
        event_id: EventId,
        requester: UserId,
        text: &str,
    ) -> Result<SubmitOutcome> {
        let text = message_text(text)?;

        self.db.immediate(|db| {
            let event = db.get_event(event_id).or_not_found("event")?;
            db.get_user(requester).or_not_found("user")?;

            let now = convene_store::now();
            let (mut conversation, is_new) = find_or_open(db, &event, requester, now)?;

            let message = db.insert_message(conversation.id, requester, &text, now)?;
            db.touch_conversation(conversation.id, now)?;
            conversation.updated_at = now;
            let message_count = db.count_messages(conversation.id)?;

            info!(
                conversation = %conversation.id,
                event = %event.id,
                requester = %requester,
                new = is_new,
                "request submitted"
            );
            Ok(SubmitOutcome {
                conversation,
                message,
                is_new_conversation: is_new,
                message_count,
            })
        })
    }

    /// Record the host's decision on a conversation.
    ///
    /// | old -> new                  | counter        |
    /// |-----------------------------|----------------|
    /// | not confirmed -> confirmed  | +1             |
    /// | confirmed -> not confirmed  | -1, floor 0    |
    /// | confirmed -> confirmed      | unchanged      |
    ///
    /// Under [`CapacityPolicy::Enforced`] a confirmation on a full event
    /// fails with [`CoreError::Conflict`] and nothing is written.
    ///
    /// [`CapacityPolicy::Enforced`]: crate::CapacityPolicy::Enforced
    pub fn transition_status(
        &self,
        conversation_id: ConversationId,
        actor: UserId,
        status: ConversationStatus,
    ) -> Result<TransitionOutcome> {
        if !status.is_decision() {
            return Err(CoreError::Validation(format!(
                "status must be confirmed or rejected, got {status}"
            )));
        }
        let enforce = self.policy.capacity.is_enforced();

        self.db.immediate(|db| {
            let mut conversation = db
                .get_conversation(conversation_id)
                .or_not_found("conversation")?;
            if conversation.host_id != actor {
                warn!(
                    conversation = %conversation.id,
                    actor = %actor,
                    "decision by non-host refused"
                );
                return Err(CoreError::Authorization(
                    "only the host may confirm or reject a request".into(),
                ));
            }

            let now = convene_store::now();
            let was_confirmed = conversation.status == ConversationStatus::Confirmed;
            let confirming = status == ConversationStatus::Confirmed;

            if confirming && !was_confirmed {
                if !db.increment_confirmed_attendees(conversation.event_id, enforce, now)? {
                    let event = db.get_event(conversation.event_id).or_not_found("event")?;
                    warn!(
                        event = %event.id,
                        confirmed = event.confirmed_attendees,
                        max = event.max_attendees,
                        "confirmation refused, event is full"
                    );
                    return Err(CoreError::Conflict(format!(
                        "event is full ({} of {} places taken)",
                        event.confirmed_attendees, event.max_attendees
                    )));
                }
                conversation.confirmed_at = Some(now);
            } else if was_confirmed && !confirming {
                db.decrement_confirmed_attendees(conversation.event_id, now)?;
            }
            if status == ConversationStatus::Rejected {
                conversation.rejected_at = Some(now);
            }

            let previous = conversation.status;
            conversation.status = status;
            conversation.updated_at = now;
            db.update_conversation_state(&conversation)?;

            let event = db.get_event(conversation.event_id).or_not_found("event")?;
            info!(
                conversation = %conversation.id,
                event = %event.id,
                from = %previous,
                to = %status,
                confirmed = event.confirmed_attendees,
                "conversation status changed"
            );
            Ok(TransitionOutcome {
                conversation,
                event: EventCapacity::from(&event),
            })
        })
    }

    pub fn get_thread(&self, conversation_id: ConversationId) -> Result<Thread> {
        let conversation = self
            .db
            .get_conversation(conversation_id)
            .or_not_found("conversation")?;
        let messages = self.db.list_messages(conversation.id)?;
        debug!(conversation = %conversation.id, messages = messages.len(), "thread loaded");
        Ok(Thread {
            conversation,
            messages,
        })
    }

    /// Every thread the user takes part in, most recent activity first.
    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<ConversationSummary>> {
        self.db.get_user(user_id).or_not_found("user")?;
        let overviews = self.db.list_conversation_overviews_for_user(user_id)?;
        Ok(overviews
            .into_iter()
            .map(|o| ConversationSummary::for_viewer(o, user_id))
            .collect())
    }

    /// Every thread of an event, for its organizer.
    pub fn list_for_event(&self, event_id: EventId, actor: UserId) -> Result<EventConversations> {
        let event = self.db.get_event(event_id).or_not_found("event")?;
        if event.organizer_id != actor {
            return Err(CoreError::Authorization(
                "only the organizer may list an event's conversations".into(),
            ));
        }
        let conversations = self.db.list_conversation_overviews_for_event(event.id, actor)?;
        Ok(EventConversations {
            event: EventCapacity::from(&event),
            conversations,
        })
    }

    /// The caller's own thread for an event, if there is one.
    pub fn find_for_event(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<ConversationOverview>> {
        self.db.get_event(event_id).or_not_found("event")?;
        match self.db.find_conversation_for_participant(event_id, user_id)? {
            Some(c) => Ok(Some(self.db.get_conversation_overview(c.id, user_id)?)),
            None => Ok(None),
        }
    }

    /// Events the user is confirmed for, most recent confirmation first,
    /// each listed once.
    pub fn confirmed_events_for_user(&self, user_id: UserId) -> Result<Vec<ConfirmedEvent>> {
        self.db.get_user(user_id).or_not_found("user")?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for conversation in self.db.list_confirmed_conversations_for_user(user_id)? {
            if !seen.insert(conversation.event_id) {
                continue;
            }
            let event = self.db.get_event(conversation.event_id)?;
            let organizer = self.db.get_user(event.organizer_id)?;

            out.push(ConfirmedEvent {
                event: EventCapacity::from(&event),
                organizer: Counterpart {
                    id: organizer.id,
                    name: organizer.name,
                },
                images: self.db.list_event_images(event.id)?,
                participants: self
                    .db
                    .list_event_participants(event.id, ConversationStatus::Confirmed)?,
                pending_requests: self
                    .db
                    .list_event_participants(event.id, ConversationStatus::Pending)?,
                conversation_id: conversation.id,
                confirmed_at: conversation.confirmed_at,
                details: event,
            });
        }
        Ok(out)
    }
}

/// Find the requester's thread for `event`, or open one.  A racing insert
/// that hits the unique (event, user, host) index falls back to the lookup.
fn find_or_open(
    db: &Database,
    event: &Event,
    requester: UserId,
    now: DateTime<Utc>,
) -> Result<(Conversation, bool)> {
    if let Some(existing) = db.find_conversation_for_participant(event.id, requester)? {
        return Ok((existing, false));
    }

    let conversation = Conversation {
        id: ConversationId::new(),
        event_id: event.id,
        user_id: requester,
        host_id: event.organizer_id,
        status: ConversationStatus::Pending,
        created_at: now,
        updated_at: now,
        confirmed_at: None,
        rejected_at: None,
    };
    match db.insert_conversation(&conversation) {
        Ok(()) => Ok((conversation, true)),
        Err(StoreError::Conflict(_)) => {
            debug!(event = %event.id, requester = %requester, "conversation created concurrently");
            let existing = db
                .find_conversation_for_participant(event.id, requester)?
                .ok_or_else(|| CoreError::Conflict("conversation vanished after conflict".into()))?;
            Ok((existing, false))
        }
        Err(other) => Err(other.into()),
    }
}
