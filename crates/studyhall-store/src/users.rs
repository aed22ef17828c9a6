//! Directory queries for [`User`] records.

use chrono::Utc;
use rusqlite::{params, params_from_iter, OptionalExtension};
use studyhall_shared::{ChangeEvent, ChangeKind, Table, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;
use crate::rows::{fmt_ts, parse_ts, parse_user_id, placeholders};

const USER_COLUMNS: &str = "id, name, email, created_at";

impl Database {
    /// Register a directory entry. Emails are unique, compared case-insensitively.
    pub fn insert_user(&self, name: &str, email: &str) -> Result<User> {
        let user = User {
            id: UserId::new(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            created_at: Utc::now(),
        };

        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    fmt_ts(&user.created_at),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::Conflict(format!("email already registered: {}", user.email))
                }
                other => StoreError::Sqlite(other),
            })?;

        self.publish(ChangeEvent::new(Table::Users, ChangeKind::Insert, user.id.0));
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![normalize_email(email)],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Fetch every directory entry whose id is in `ids`. Unknown ids are
    /// simply absent from the result.
    pub fn get_users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter().map(|id| id.to_string())), row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let email: String = row.get(2)?;
    let created_str: String = row.get(3)?;

    Ok(User {
        id: parse_user_id(0, &id_str)?,
        name,
        email,
        created_at: parse_ts(3, &created_str)?,
    })
}
