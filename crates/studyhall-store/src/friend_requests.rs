//! Queries and state transitions for [`FriendRequest`] rows.

use chrono::Utc;
use rusqlite::{params, Connection};
use studyhall_shared::{ChangeEvent, ChangeKind, RequestStatus, Table, UserId};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::friends::insert_link;
use crate::models::FriendRequest;
use crate::rows::{fmt_ts, map_not_found, parse_enum, parse_ts, parse_user_id, parse_uuid};

const REQUEST_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at";

impl Database {
    /// Record a new pending request from `sender` to `receiver`.
    pub fn insert_friend_request(&self, sender: UserId, receiver: UserId) -> Result<FriendRequest> {
        let request = FriendRequest {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO friend_requests (id, sender_id, receiver_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                request.id.to_string(),
                sender.to_string(),
                receiver.to_string(),
                request.status.as_str(),
                fmt_ts(&request.created_at),
            ],
        )?;

        self.publish(ChangeEvent::new(
            Table::FriendRequests,
            ChangeKind::Insert,
            request.id,
        ));
        Ok(request)
    }

    pub fn get_friend_request(&self, id: Uuid) -> Result<FriendRequest> {
        get_request(self.conn(), id)
    }

    pub fn pending_request_exists(&self, sender: UserId, receiver: UserId) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM friend_requests
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'pending'
             )",
            params![sender.to_string(), receiver.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Pending requests addressed to `receiver`, newest first.
    pub fn list_pending_requests_for(&self, receiver: UserId) -> Result<Vec<FriendRequest>> {
        self.list_requests(
            "receiver_id = ?1 AND status = 'pending'",
            receiver,
        )
    }

    /// Every request `sender` has sent, in any state, newest first.
    pub fn list_requests_sent_by(&self, sender: UserId) -> Result<Vec<FriendRequest>> {
        self.list_requests("sender_id = ?1", sender)
    }

    fn list_requests(&self, predicate: &str, user: UserId) -> Result<Vec<FriendRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests
             WHERE {predicate}
             ORDER BY created_at DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user.to_string()], row_to_request)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }

    /// Move a request out of `pending`. Fails with [`StoreError::Conflict`]
    /// when the request is already terminal.
    pub fn set_request_status(&self, id: Uuid, status: RequestStatus) -> Result<FriendRequest> {
        let tx = self.conn().unchecked_transaction()?;
        let updated = transition(&tx, id, status)?;
        tx.commit()?;

        self.publish(ChangeEvent::new(Table::FriendRequests, ChangeKind::Update, id));
        Ok(updated)
    }

    /// Accept a pending request: insert both link directions and mark the
    /// request accepted, all in one transaction.
    pub fn accept_friend_request(&self, id: Uuid) -> Result<FriendRequest> {
        let now = Utc::now();
        let tx = self.conn().unchecked_transaction()?;

        let request = get_request(&tx, id)?;
        if !request.status.can_transition_to(RequestStatus::Accepted) {
            return Err(StoreError::Conflict(format!(
                "request {id} is already {}",
                request.status
            )));
        }

        let mut inserted = Vec::with_capacity(2);
        inserted.extend(insert_link(&tx, request.sender_id, request.receiver_id, &now)?);
        inserted.extend(insert_link(&tx, request.receiver_id, request.sender_id, &now)?);
        let accepted = transition(&tx, id, RequestStatus::Accepted)?;
        tx.commit()?;

        tracing::debug!(request = %id, links = inserted.len(), "friend request accepted");

        for link_id in inserted {
            self.publish(ChangeEvent::new(Table::Friends, ChangeKind::Insert, link_id));
        }
        self.publish(ChangeEvent::new(Table::FriendRequests, ChangeKind::Update, id));
        Ok(accepted)
    }
}

fn get_request(conn: &Connection, id: Uuid) -> Result<FriendRequest> {
    conn.query_row(
        &format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"),
        params![id.to_string()],
        row_to_request,
    )
    .map_err(map_not_found)
}

fn transition(conn: &Connection, id: Uuid, next: RequestStatus) -> Result<FriendRequest> {
    let mut request = get_request(conn, id)?;
    if !request.status.can_transition_to(next) {
        return Err(StoreError::Conflict(format!(
            "request {id} cannot move from {} to {next}",
            request.status
        )));
    }

    conn.execute(
        "UPDATE friend_requests SET status = ?1 WHERE id = ?2",
        params![next.as_str(), id.to_string()],
    )?;
    request.status = next;
    Ok(request)
}

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendRequest> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let receiver_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(FriendRequest {
        id: parse_uuid(0, &id_str)?,
        sender_id: parse_user_id(1, &sender_str)?,
        receiver_id: parse_user_id(2, &receiver_str)?,
        status: parse_enum(3, &status_str)?,
        created_at: parse_ts(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory(16).unwrap()
    }

    #[test]
    fn test_accept_creates_both_links() {
        let db = db();
        let (a, b) = (UserId::new(), UserId::new());
        let request = db.insert_friend_request(a, b).unwrap();
        assert!(db.pending_request_exists(a, b).unwrap());
        assert!(!db.pending_request_exists(b, a).unwrap());

        let accepted = db.accept_friend_request(request.id).unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);

        let links_a = db.list_friend_links(a).unwrap();
        let links_b = db.list_friend_links(b).unwrap();
        assert_eq!(links_a.len(), 1);
        assert_eq!(links_b.len(), 1);
        assert_eq!(links_a[0].friend_id, b);
        assert_eq!(links_b[0].friend_id, a);
        assert!(!db.pending_request_exists(a, b).unwrap());
    }

    #[test]
    fn test_accept_twice_is_conflict_and_writes_nothing() {
        let db = db();
        let (a, b) = (UserId::new(), UserId::new());
        let request = db.insert_friend_request(a, b).unwrap();
        db.accept_friend_request(request.id).unwrap();

        let err = db.accept_friend_request(request.id).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(db.list_friend_links(a).unwrap().len(), 1);
    }

    #[test]
    fn test_reject_is_terminal_and_creates_no_links() {
        let db = db();
        let (a, b) = (UserId::new(), UserId::new());
        let request = db.insert_friend_request(a, b).unwrap();

        let rejected = db
            .set_request_status(request.id, RequestStatus::Rejected)
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert!(db.list_friend_links(a).unwrap().is_empty());
        assert!(db.list_pending_requests_for(b).unwrap().is_empty());

        assert!(matches!(
            db.accept_friend_request(request.id),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            db.set_request_status(request.id, RequestStatus::Pending),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_unknown_request_is_not_found() {
        let db = db();
        assert!(matches!(
            db.accept_friend_request(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_pending_listing_only_shows_receiver_pending() {
        let db = db();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        db.insert_friend_request(a, b).unwrap();
        db.insert_friend_request(c, b).unwrap();
        let stale = db.insert_friend_request(a, c).unwrap();
        db.set_request_status(stale.id, RequestStatus::Rejected).unwrap();

        assert_eq!(db.list_pending_requests_for(b).unwrap().len(), 2);
        assert!(db.list_pending_requests_for(c).unwrap().is_empty());
        assert_eq!(db.list_requests_sent_by(a).unwrap().len(), 2);
    }
}
