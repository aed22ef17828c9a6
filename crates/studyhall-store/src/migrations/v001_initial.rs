//! v001 -- Initial schema creation.
//!
//! Creates the directory table `users` and the four social tables:
//! `friends`, `friend_requests`, `study_sessions` and `group_messages`.
//!
//! User ids in the social tables deliberately carry no foreign key to
//! `users`: rows may outlive or predate their directory entry.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (read-only directory from the client's point of view)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name       TEXT NOT NULL,
    email      TEXT NOT NULL UNIQUE,          -- stored lower-cased
    created_at TEXT NOT NULL                  -- RFC-3339, fixed nanosecond width
);

-- ----------------------------------------------------------------
-- Friend links (one row per direction)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS friends (
    id         TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,                 -- owner
    friend_id  TEXT NOT NULL,
    created_at TEXT NOT NULL,

    UNIQUE (user_id, friend_id)
);

CREATE INDEX IF NOT EXISTS idx_friends_friend ON friends(friend_id);

-- ----------------------------------------------------------------
-- Friend requests
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS friend_requests (
    id          TEXT PRIMARY KEY NOT NULL,
    sender_id   TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'accepted', 'rejected')),
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_friend_requests_receiver
    ON friend_requests(receiver_id, status);
CREATE INDEX IF NOT EXISTS idx_friend_requests_sender
    ON friend_requests(sender_id, status);

-- ----------------------------------------------------------------
-- Study sessions (presence, one row per user)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS study_sessions (
    id          TEXT PRIMARY KEY NOT NULL,
    user_id     TEXT NOT NULL UNIQUE,
    status      TEXT NOT NULL
                CHECK (status IN ('studying', 'break', 'offline')),
    subject     TEXT,
    started_at  TEXT NOT NULL,
    last_active TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Group messages (global feed, append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_messages (
    id         TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,
    message    TEXT NOT NULL,
    mentions   TEXT NOT NULL DEFAULT '[]',    -- JSON array of user ids
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_group_messages_created
    ON group_messages(created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
