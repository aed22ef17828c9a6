//! Remote data access layer.
//!
//! [`RemoteBackend`] is the row-level interface the sync controller talks
//! to: equality and membership filtered reads, inserts, upserts, deletes,
//! and the change-feed subscription.  [`LocalBackend`] serves it from a
//! [`Database`], running every call on the blocking pool so the async
//! caller is never stalled by SQLite.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use studyhall_shared::{ChangeEvent, RequestStatus, StudyStatus, UserId};
use studyhall_store::{
    ChangeFeed, Database, Donation, FriendLink, FriendRequest, GroupMessage, NewDonation,
    StoreError, StudySession, User,
};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    // -- users (read-only directory) --

    async fn find_user_by_email(&self, email: &str) -> BackendResult<Option<User>>;

    async fn users_by_ids(&self, ids: &[UserId]) -> BackendResult<Vec<User>>;

    // -- friends --

    async fn friend_links(&self, owner: UserId) -> BackendResult<Vec<FriendLink>>;

    async fn friendship_exists(&self, a: UserId, b: UserId) -> BackendResult<bool>;

    /// Delete both directions; returns the number of rows removed.
    async fn delete_friendship(&self, a: UserId, b: UserId) -> BackendResult<usize>;

    // -- friend_requests --

    async fn pending_request_exists(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> BackendResult<bool>;

    async fn insert_friend_request(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> BackendResult<FriendRequest>;

    async fn friend_request(&self, id: Uuid) -> BackendResult<Option<FriendRequest>>;

    async fn pending_requests_for(&self, receiver: UserId) -> BackendResult<Vec<FriendRequest>>;

    /// Insert both link rows and mark the request accepted, atomically.
    async fn accept_friend_request(&self, id: Uuid) -> BackendResult<FriendRequest>;

    async fn set_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> BackendResult<FriendRequest>;

    // -- study_sessions --

    async fn study_sessions(&self, users: &[UserId]) -> BackendResult<Vec<StudySession>>;

    /// Upsert keyed by user id, stamping `last_active` with the current time.
    async fn upsert_study_session(
        &self,
        user: UserId,
        status: StudyStatus,
        subject: Option<String>,
    ) -> BackendResult<StudySession>;

    // -- group_messages --

    /// The `limit` most recent messages, newest first.
    async fn recent_group_messages(&self, limit: usize) -> BackendResult<Vec<GroupMessage>>;

    async fn insert_group_message(
        &self,
        author: UserId,
        message: String,
        mentions: Vec<UserId>,
    ) -> BackendResult<GroupMessage>;

    // -- donations --

    async fn insert_donation(&self, donation: NewDonation) -> BackendResult<Donation>;

    // -- change feed --

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// [`RemoteBackend`] over an embedded [`Database`].
#[derive(Clone)]
pub struct LocalBackend {
    db: Arc<Mutex<Database>>,
    feed: ChangeFeed,
}

impl LocalBackend {
    pub fn new(db: Database) -> Self {
        let feed = db.feed().clone();
        Self {
            db: Arc::new(Mutex::new(db)),
            feed,
        }
    }

    /// Run `f` against the database on the current thread. Intended for
    /// seeding and administrative tasks outside the sync layer.
    pub fn with_database<T>(
        &self,
        f: impl FnOnce(&Database) -> studyhall_store::Result<T>,
    ) -> BackendResult<T> {
        let guard = self
            .db
            .lock()
            .map_err(|e| BackendError::Unavailable(format!("Lock poisoned: {e}")))?;
        f(&guard).map_err(BackendError::from)
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> BackendResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> studyhall_store::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| BackendError::Unavailable(format!("Lock poisoned: {e}")))?;
            f(&guard).map_err(BackendError::from)
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("{op} task failed: {e}")))?
    }
}

#[async_trait]
impl RemoteBackend for LocalBackend {
    async fn find_user_by_email(&self, email: &str) -> BackendResult<Option<User>> {
        let email = email.to_string();
        self.run("find_user_by_email", move |db| db.find_user_by_email(&email))
            .await
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> BackendResult<Vec<User>> {
        let ids = ids.to_vec();
        self.run("users_by_ids", move |db| db.get_users_by_ids(&ids))
            .await
    }

    async fn friend_links(&self, owner: UserId) -> BackendResult<Vec<FriendLink>> {
        self.run("friend_links", move |db| db.list_friend_links(owner))
            .await
    }

    async fn friendship_exists(&self, a: UserId, b: UserId) -> BackendResult<bool> {
        self.run("friendship_exists", move |db| db.friendship_exists(a, b))
            .await
    }

    async fn delete_friendship(&self, a: UserId, b: UserId) -> BackendResult<usize> {
        self.run("delete_friendship", move |db| db.delete_friendship(a, b))
            .await
    }

    async fn pending_request_exists(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> BackendResult<bool> {
        self.run("pending_request_exists", move |db| {
            db.pending_request_exists(sender, receiver)
        })
        .await
    }

    async fn insert_friend_request(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> BackendResult<FriendRequest> {
        self.run("insert_friend_request", move |db| {
            db.insert_friend_request(sender, receiver)
        })
        .await
    }

    async fn friend_request(&self, id: Uuid) -> BackendResult<Option<FriendRequest>> {
        self.run("friend_request", move |db| match db.get_friend_request(id) {
            Ok(request) => Ok(Some(request)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn pending_requests_for(&self, receiver: UserId) -> BackendResult<Vec<FriendRequest>> {
        self.run("pending_requests_for", move |db| {
            db.list_pending_requests_for(receiver)
        })
        .await
    }

    async fn accept_friend_request(&self, id: Uuid) -> BackendResult<FriendRequest> {
        self.run("accept_friend_request", move |db| db.accept_friend_request(id))
            .await
    }

    async fn set_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> BackendResult<FriendRequest> {
        self.run("set_request_status", move |db| db.set_request_status(id, status))
            .await
    }

    async fn study_sessions(&self, users: &[UserId]) -> BackendResult<Vec<StudySession>> {
        let users = users.to_vec();
        self.run("study_sessions", move |db| db.list_study_sessions(&users))
            .await
    }

    async fn upsert_study_session(
        &self,
        user: UserId,
        status: StudyStatus,
        subject: Option<String>,
    ) -> BackendResult<StudySession> {
        self.run("upsert_study_session", move |db| {
            db.upsert_study_session(user, status, subject.as_deref(), Utc::now())
        })
        .await
    }

    async fn recent_group_messages(&self, limit: usize) -> BackendResult<Vec<GroupMessage>> {
        self.run("recent_group_messages", move |db| {
            db.list_recent_group_messages(limit)
        })
        .await
    }

    async fn insert_group_message(
        &self,
        author: UserId,
        message: String,
        mentions: Vec<UserId>,
    ) -> BackendResult<GroupMessage> {
        self.run("insert_group_message", move |db| {
            db.insert_group_message(author, &message, &mentions)
        })
        .await
    }

    async fn insert_donation(&self, donation: NewDonation) -> BackendResult<Donation> {
        self.run("insert_donation", move |db| db.insert_donation(&donation))
            .await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_backend_round_trip() {
        let backend = LocalBackend::new(Database::open_in_memory(16).unwrap());
        let ada = backend
            .with_database(|db| db.insert_user("Ada", "ada@example.com"))
            .unwrap();

        let found = backend.find_user_by_email("ada@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(ada.id));
        assert!(backend.friend_request(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribe_sees_backend_writes() {
        let backend = LocalBackend::new(Database::open_in_memory(16).unwrap());
        let mut rx = backend.subscribe();

        let message = backend
            .insert_group_message(UserId::new(), "hello".into(), vec![])
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.row_id, message.id);
    }
}
