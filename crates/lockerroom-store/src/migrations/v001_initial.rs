//! v001 -- Initial schema creation.
//!
//! Creates `threads`, `thread_participants` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Threads (global chat and direct messages)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS threads (
    id             TEXT PRIMARY KEY NOT NULL,   -- "global" or "dm_<a>_<b>"
    kind           TEXT NOT NULL,               -- "global" | "dm"
    display_names  TEXT NOT NULL,               -- JSON object, user id -> name
    last_message   TEXT NOT NULL DEFAULT '',
    last_timestamp TEXT NOT NULL,               -- RFC-3339, UTC, microseconds
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Participants (direct threads only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS thread_participants (
    thread_id TEXT NOT NULL,                    -- FK -> threads(id)
    user_id   TEXT NOT NULL,
    position  INTEGER NOT NULL,                 -- canonical (sorted) order

    PRIMARY KEY (thread_id, user_id),
    FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_participants_user
    ON thread_participants(user_id);

-- ----------------------------------------------------------------
-- Messages (append-only log per thread)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq                 INTEGER PRIMARY KEY AUTOINCREMENT,
    id                  TEXT NOT NULL UNIQUE,   -- UUID v4
    thread_id           TEXT NOT NULL,
    sender_id           TEXT NOT NULL,
    sender_display_name TEXT NOT NULL,
    content             TEXT NOT NULL,
    timestamp           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_thread_ts
    ON messages(thread_id, timestamp, seq);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
