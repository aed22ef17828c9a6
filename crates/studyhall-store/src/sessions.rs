//! Presence rows: one [`StudySession`] per user, written by upsert.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use studyhall_shared::{ChangeEvent, ChangeKind, StudyStatus, Table, UserId};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::StudySession;
use crate::rows::{fmt_ts, parse_enum, parse_ts, parse_user_id, parse_uuid, placeholders};

const SESSION_COLUMNS: &str = "id, user_id, status, subject, started_at, last_active";

impl Database {
    /// Insert or update the presence row of `user`, keyed by user id.
    ///
    /// `last_active` is stamped with `now`, bumped if needed so it is strictly
    /// greater than the previous value. `started_at` is reset whenever the
    /// status changes.
    pub fn upsert_study_session(
        &self,
        user: UserId,
        status: StudyStatus,
        subject: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StudySession> {
        let tx = self.conn().unchecked_transaction()?;
        let previous = session_for_user(&tx, user)?;
        let kind = if previous.is_some() {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };

        let session = match previous {
            Some(prev) => {
                let last_active = if now > prev.last_active {
                    now
                } else {
                    prev.last_active + Duration::nanoseconds(1)
                };
                let started_at = if prev.status == status {
                    prev.started_at
                } else {
                    last_active
                };
                StudySession {
                    id: prev.id,
                    user_id: user,
                    status,
                    subject: subject.map(str::to_string),
                    started_at,
                    last_active,
                }
            }
            None => StudySession {
                id: Uuid::new_v4(),
                user_id: user,
                status,
                subject: subject.map(str::to_string),
                started_at: now,
                last_active: now,
            },
        };

        tx.execute(
            "INSERT INTO study_sessions (id, user_id, status, subject, started_at, last_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id) DO UPDATE SET
                 status = excluded.status,
                 subject = excluded.subject,
                 started_at = excluded.started_at,
                 last_active = excluded.last_active",
            params![
                session.id.to_string(),
                user.to_string(),
                session.status.as_str(),
                session.subject,
                fmt_ts(&session.started_at),
                fmt_ts(&session.last_active),
            ],
        )?;
        tx.commit()?;

        self.publish(ChangeEvent::new(Table::StudySessions, kind, session.id));
        Ok(session)
    }

    /// Presence rows for every user in `users`, most recently active first.
    pub fn list_study_sessions(&self, users: &[UserId]) -> Result<Vec<StudySession>> {
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions
             WHERE user_id IN ({})
             ORDER BY last_active DESC",
            placeholders(users.len())
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(users.iter().map(|id| id.to_string())),
            row_to_session,
        )?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }
}

fn session_for_user(conn: &Connection, user: UserId) -> Result<Option<StudySession>> {
    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM study_sessions WHERE user_id = ?1"),
            params![user.to_string()],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudySession> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let subject: Option<String> = row.get(3)?;
    let started_str: String = row.get(4)?;
    let active_str: String = row.get(5)?;

    Ok(StudySession {
        id: parse_uuid(0, &id_str)?,
        user_id: parse_user_id(1, &user_str)?,
        status: parse_enum(2, &status_str)?,
        subject,
        started_at: parse_ts(4, &started_str)?,
        last_active: parse_ts(5, &active_str)?,
    })
}
