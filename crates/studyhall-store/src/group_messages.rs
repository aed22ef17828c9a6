//! Append-only group chat feed stored in [`GroupMessage`] rows.

use chrono::Utc;
use rusqlite::params;
use studyhall_shared::{ChangeEvent, ChangeKind, Table, UserId};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::GroupMessage;
use crate::rows::{fmt_ts, map_not_found, parse_ts, parse_user_id, parse_uuid};

impl Database {
    pub fn insert_group_message(
        &self,
        author: UserId,
        message: &str,
        mentions: &[UserId],
    ) -> Result<GroupMessage> {
        let message = GroupMessage {
            id: Uuid::new_v4(),
            user_id: author,
            message: message.to_string(),
            mentions: mentions.to_vec(),
            created_at: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO group_messages (id, user_id, message, mentions, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.to_string(),
                author.to_string(),
                message.message,
                serde_json::to_string(&message.mentions)?,
                fmt_ts(&message.created_at),
            ],
        )?;

        self.publish(ChangeEvent::new(
            Table::GroupMessages,
            ChangeKind::Insert,
            message.id,
        ));
        Ok(message)
    }

    /// The `limit` most recent messages, newest first. Messages written in
    /// the same instant keep insertion order.
    pub fn list_recent_group_messages(&self, limit: usize) -> Result<Vec<GroupMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, message, mentions, created_at
             FROM group_messages
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_group_message(&self, id: Uuid) -> Result<GroupMessage> {
        self.conn()
            .query_row(
                "SELECT id, user_id, message, mentions, created_at
                 FROM group_messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(map_not_found)
    }

    pub fn count_group_messages(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM group_messages", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupMessage> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let message: String = row.get(2)?;
    let mentions_json: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let mentions: Vec<UserId> = serde_json::from_str(&mentions_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(GroupMessage {
        id: parse_uuid(0, &id_str)?,
        user_id: parse_user_id(1, &user_str)?,
        message,
        mentions,
        created_at: parse_ts(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_is_newest_first_and_bounded() {
        let db = Database::open_in_memory(16).unwrap();
        let author = UserId::new();
        for i in 0..7 {
            db.insert_group_message(author, &format!("msg {i}"), &[]).unwrap();
        }

        let recent = db.list_recent_group_messages(5).unwrap();
        let texts: Vec<&str> = recent.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, ["msg 6", "msg 5", "msg 4", "msg 3", "msg 2"]);
        assert_eq!(db.count_group_messages().unwrap(), 7);
    }

    #[test]
    fn test_mentions_survive_storage() {
        let db = Database::open_in_memory(16).unwrap();
        let author = UserId::new();
        let mentioned = vec![UserId::new(), UserId::new()];

        let sent = db
            .insert_group_message(author, "study group at 6?", &mentioned)
            .unwrap();
        let loaded = db.get_group_message(sent.id).unwrap();
        assert_eq!(loaded.mentions, mentioned);
        assert_eq!(loaded, sent);
    }
}
