//! The message ledger: appending to a thread and read receipts.

use tracing::{debug, info};

use convene_shared::constants::MAX_MESSAGE_LEN;
use convene_shared::{ConversationId, UserId};
use convene_store::{Conversation, Message};

use crate::error::{CoreError, OrNotFound, Result};
use crate::Engine;

/// Trim and check a message body.
pub(crate) fn message_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(CoreError::Validation("message must not be empty".into()));
    }
    let len = text.chars().count();
    if len > MAX_MESSAGE_LEN {
        return Err(CoreError::Validation(format!(
            "message is {len} characters, the limit is {MAX_MESSAGE_LEN}"
        )));
    }
    Ok(text.to_string())
}

fn ensure_participant(conversation: &Conversation, user: UserId) -> Result<()> {
    if !conversation.is_participant(user) {
        return Err(CoreError::Authorization(
            "not a participant of this conversation".into(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Append a message from one of the two participants.
    pub fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        text: &str,
    ) -> Result<Message> {
        let text = message_text(text)?;

        self.db.immediate(|db| {
            let conversation = db
                .get_conversation(conversation_id)
                .or_not_found("conversation")?;
            ensure_participant(&conversation, sender)?;

            let now = convene_store::now();
            let message = db.insert_message(conversation.id, sender, &text, now)?;
            db.touch_conversation(conversation.id, now)?;

            info!(conversation = %conversation.id, sender = %sender, "message appended");
            Ok(message)
        })
    }

    /// Mark everything the other participant sent as read.  Returns how many
    /// messages changed; a repeated call returns 0.
    pub fn mark_read(&self, conversation_id: ConversationId, reader: UserId) -> Result<usize> {
        let conversation = self
            .db
            .get_conversation(conversation_id)
            .or_not_found("conversation")?;
        ensure_participant(&conversation, reader)?;

        let marked = self
            .db
            .mark_messages_read(conversation.id, reader, convene_store::now())?;
        debug!(conversation = %conversation.id, reader = %reader, marked, "messages marked read");
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, host_event, register};

    #[test]
    fn participants_append_and_touch_the_thread() {
        let engine = engine();
        let host = register(&engine, "Hana");
        let guest = register(&engine, "Gus");
        let stranger = register(&engine, "Stan");
        let event = host_event(&engine, &host, 10);
        let opened = engine.submit_request(event.id, guest.id, "Hi").unwrap().conversation;

        let reply = engine.append_message(opened.id, host.id, " Welcome! ").unwrap();
        assert_eq!(reply.text, "Welcome!");

        let thread = engine.get_thread(opened.id).unwrap();
        assert_eq!(thread.messages.len(), 2);
        assert!(thread.conversation.updated_at >= opened.updated_at);

        assert!(matches!(
            engine.append_message(opened.id, stranger.id, "let me in"),
            Err(CoreError::Authorization(_))
        ));
    }

    #[test]
    fn overlong_messages_are_rejected() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(matches!(message_text(&long), Err(CoreError::Validation(_))));
        let longest = message_text(&"é".repeat(MAX_MESSAGE_LEN)).unwrap();
        assert_eq!(longest.chars().count(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn mark_read_is_idempotent() {
        let engine = engine();
        let host = register(&engine, "Hana");
        let guest = register(&engine, "Gus");
        let event = host_event(&engine, &host, 10);
        let c = engine.submit_request(event.id, guest.id, "one").unwrap().conversation;
        engine.append_message(c.id, guest.id, "two").unwrap();
        engine.append_message(c.id, host.id, "three").unwrap();

        assert_eq!(engine.mark_read(c.id, host.id).unwrap(), 2);
        assert_eq!(engine.mark_read(c.id, host.id).unwrap(), 0);
        assert_eq!(engine.mark_read(c.id, guest.id).unwrap(), 1);

        let outsider = register(&engine, "Otto");
        assert!(matches!(
            engine.mark_read(c.id, outsider.id),
            Err(CoreError::Authorization(_))
        ));
    }
}
