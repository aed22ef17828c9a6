//! Queries for [`FriendLink`] rows.
//!
//! A mutual friendship is two rows, one per direction. Links are only
//! created by accepting a request (see `friend_requests.rs`).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use studyhall_shared::{ChangeEvent, ChangeKind, Table, UserId};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::FriendLink;
use crate::rows::{fmt_ts, parse_ts, parse_user_id, parse_uuid};

impl Database {
    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Links owned by `owner`, oldest first.
    pub fn list_friend_links(&self, owner: UserId) -> Result<Vec<FriendLink>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, friend_id, created_at
             FROM friends
             WHERE user_id = ?1
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![owner.to_string()], row_to_link)?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    /// Whether a link exists in either direction between `a` and `b`.
    pub fn friendship_exists(&self, a: UserId, b: UserId) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM friends
                 WHERE (user_id = ?1 AND friend_id = ?2)
                    OR (user_id = ?2 AND friend_id = ?1)
             )",
            params![a.to_string(), b.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete both directions of the friendship between `a` and `b` in one
    /// statement. Returns the number of rows removed (0 when they were not
    /// friends).
    pub fn delete_friendship(&self, a: UserId, b: UserId) -> Result<usize> {
        let tx = self.conn().unchecked_transaction()?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM friends
                 WHERE (user_id = ?1 AND friend_id = ?2)
                    OR (user_id = ?2 AND friend_id = ?1)",
            )?;
            let rows = stmt.query_map(params![a.to_string(), b.to_string()], |row| {
                let id: String = row.get(0)?;
                parse_uuid(0, &id)
            })?;
            rows.collect::<rusqlite::Result<Vec<Uuid>>>()?
        };

        let affected = tx.execute(
            "DELETE FROM friends
             WHERE (user_id = ?1 AND friend_id = ?2)
                OR (user_id = ?2 AND friend_id = ?1)",
            params![a.to_string(), b.to_string()],
        )?;
        tx.commit()?;

        for id in ids {
            self.publish(ChangeEvent::new(Table::Friends, ChangeKind::Delete, id));
        }
        Ok(affected)
    }
}

/// Insert the `owner -> friend` link unless it already exists. Returns the
/// id of a newly inserted row.
pub(crate) fn insert_link(
    conn: &Connection,
    owner: UserId,
    friend: UserId,
    now: &DateTime<Utc>,
) -> rusqlite::Result<Option<Uuid>> {
    let id = Uuid::new_v4();
    let inserted = conn.execute(
        "INSERT INTO friends (id, user_id, friend_id, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, friend_id) DO NOTHING",
        params![id.to_string(), owner.to_string(), friend.to_string(), fmt_ts(now)],
    )?;
    Ok((inserted > 0).then_some(id))
}

fn row_to_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendLink> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let friend_str: String = row.get(2)?;
    let created_str: String = row.get(3)?;

    Ok(FriendLink {
        id: parse_uuid(0, &id_str)?,
        user_id: parse_user_id(1, &user_str)?,
        friend_id: parse_user_id(2, &friend_str)?,
        created_at: parse_ts(3, &created_str)?,
    })
}
