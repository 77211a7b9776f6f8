//! v001 -- Initial schema creation.
//!
//! Creates the identity and catalog tables: `users`, `categories`, `events`
//! and `event_images`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name          TEXT NOT NULL,
    email         TEXT NOT NULL COLLATE NOCASE,
    password_hash TEXT NOT NULL,               -- produced by the auth layer
    created_at    TEXT NOT NULL,               -- RFC-3339, microseconds
    updated_at    TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- ----------------------------------------------------------------
-- Categories
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS categories (
    id          TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT NOT NULL DEFAULT '',
    icon        TEXT NOT NULL DEFAULT ''
);

-- ----------------------------------------------------------------
-- Events
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS events (
    id                  TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    title               TEXT NOT NULL,
    description         TEXT NOT NULL,
    category_id         TEXT,                       -- nullable FK -> categories(id)
    max_attendees       INTEGER NOT NULL CHECK (max_attendees >= 1),
    confirmed_attendees INTEGER NOT NULL DEFAULT 0 CHECK (confirmed_attendees >= 0),
    start_date          TEXT NOT NULL,              -- YYYY-MM-DD
    end_date            TEXT NOT NULL,
    start_time          TEXT NOT NULL,              -- HH:MM:SS
    end_time            TEXT NOT NULL,
    street              TEXT NOT NULL,
    city                TEXT NOT NULL,
    state               TEXT NOT NULL,
    postal_code         TEXT NOT NULL,
    organizer_id        TEXT NOT NULL,              -- FK -> users(id)
    is_active           INTEGER NOT NULL DEFAULT 1, -- boolean 0/1
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,

    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
    FOREIGN KEY (organizer_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_events_dates ON events(start_date, end_date);
CREATE INDEX IF NOT EXISTS idx_events_location ON events(city, state);
CREATE INDEX IF NOT EXISTS idx_events_organizer ON events(organizer_id);
CREATE INDEX IF NOT EXISTS idx_events_active ON events(is_active);

-- ----------------------------------------------------------------
-- Event images
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS event_images (
    id           TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    event_id     TEXT NOT NULL,                -- FK -> events(id)
    data         BLOB NOT NULL,
    content_hash TEXT NOT NULL,                -- BLAKE3, hex
    caption      TEXT NOT NULL DEFAULT '',
    is_primary   INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    uploaded_at  TEXT NOT NULL,

    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_event_images_event ON event_images(event_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
