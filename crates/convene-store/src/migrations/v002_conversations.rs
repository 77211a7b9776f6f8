//! v002 -- Request threads.
//!
//! Adds `conversations`, unique per (event, attendee, host), and their
//! `messages`, indexed for ordered reads and unread counts.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    event_id     TEXT NOT NULL,               -- FK -> events(id)
    user_id      TEXT NOT NULL,               -- attendee, FK -> users(id)
    host_id      TEXT NOT NULL,               -- organizer at creation, FK -> users(id)
    status       TEXT NOT NULL DEFAULT 'pending'
                 CHECK (status IN ('pending', 'confirmed', 'rejected')),
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    confirmed_at TEXT,
    rejected_at  TEXT,

    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (host_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_triple
    ON conversations(event_id, user_id, host_id);
CREATE INDEX IF NOT EXISTS idx_conversations_event_host
    ON conversations(event_id, host_id);
CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id);
CREATE INDEX IF NOT EXISTS idx_conversations_host ON conversations(host_id);

CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation_id TEXT NOT NULL,              -- FK -> conversations(id)
    sender_id       TEXT NOT NULL,              -- FK -> users(id)
    text            TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    read_at         TEXT,
    created_at      TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
    FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_unread
    ON messages(conversation_id, is_read);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
