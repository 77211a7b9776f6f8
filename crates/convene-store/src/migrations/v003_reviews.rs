//! v003 -- Reviews.
//!
//! One review per (event, reviewer), indexed by host for rating stats.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS reviews (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    event_id    TEXT NOT NULL,               -- FK -> events(id)
    host_id     TEXT NOT NULL,               -- organizer at review time
    reviewer_id TEXT NOT NULL,               -- FK -> users(id)
    rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    comment     TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,

    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
    FOREIGN KEY (host_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (reviewer_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_event_reviewer
    ON reviews(event_id, reviewer_id);
CREATE INDEX IF NOT EXISTS idx_reviews_host ON reviews(host_id);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
