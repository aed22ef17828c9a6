//! v002 -- Donations table.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS donations (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    donor_name   TEXT NOT NULL,
    email        TEXT NOT NULL,
    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
    message      TEXT,
    created_at   TEXT NOT NULL                -- RFC-3339, fixed nanosecond width
);

CREATE INDEX IF NOT EXISTS idx_donations_created ON donations(created_at DESC);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
