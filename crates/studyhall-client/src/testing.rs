//! Test doubles for the backend seam.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use studyhall_shared::{ChangeEvent, RequestStatus, StudyStatus, UserId};
use studyhall_store::{
    Donation, FriendLink, FriendRequest, GroupMessage, NewDonation, StudySession, User,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::backend::{BackendError, BackendResult, LocalBackend, RemoteBackend};

/// Wraps a [`LocalBackend`] and fails every call while switched off, or
/// only directory lookups. The change feed keeps working.
pub(crate) struct FlakyBackend {
    inner: LocalBackend,
    failing: AtomicBool,
    directory_failing: AtomicBool,
}

impl FlakyBackend {
    pub(crate) fn new(inner: LocalBackend) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            directory_failing: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_directory_failing(&self, failing: bool) {
        self.directory_failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> BackendResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("injected outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteBackend for FlakyBackend {
    async fn find_user_by_email(&self, email: &str) -> BackendResult<Option<User>> {
        self.check()?;
        self.inner.find_user_by_email(email).await
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> BackendResult<Vec<User>> {
        self.check()?;
        if self.directory_failing.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("directory outage".into()));
        }
        self.inner.users_by_ids(ids).await
    }

    async fn friend_links(&self, owner: UserId) -> BackendResult<Vec<FriendLink>> {
        self.check()?;
        self.inner.friend_links(owner).await
    }

    async fn friendship_exists(&self, a: UserId, b: UserId) -> BackendResult<bool> {
        self.check()?;
        self.inner.friendship_exists(a, b).await
    }

    async fn delete_friendship(&self, a: UserId, b: UserId) -> BackendResult<usize> {
        self.check()?;
        self.inner.delete_friendship(a, b).await
    }

    async fn pending_request_exists(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> BackendResult<bool> {
        self.check()?;
        self.inner.pending_request_exists(sender, receiver).await
    }

    async fn insert_friend_request(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> BackendResult<FriendRequest> {
        self.check()?;
        self.inner.insert_friend_request(sender, receiver).await
    }

    async fn friend_request(&self, id: Uuid) -> BackendResult<Option<FriendRequest>> {
        self.check()?;
        self.inner.friend_request(id).await
    }

    async fn pending_requests_for(&self, receiver: UserId) -> BackendResult<Vec<FriendRequest>> {
        self.check()?;
        self.inner.pending_requests_for(receiver).await
    }

    async fn accept_friend_request(&self, id: Uuid) -> BackendResult<FriendRequest> {
        self.check()?;
        self.inner.accept_friend_request(id).await
    }

    async fn set_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> BackendResult<FriendRequest> {
        self.check()?;
        self.inner.set_request_status(id, status).await
    }

    async fn study_sessions(&self, users: &[UserId]) -> BackendResult<Vec<StudySession>> {
        self.check()?;
        self.inner.study_sessions(users).await
    }

    async fn upsert_study_session(
        &self,
        user: UserId,
        status: StudyStatus,
        subject: Option<String>,
    ) -> BackendResult<StudySession> {
        self.check()?;
        self.inner.upsert_study_session(user, status, subject).await
    }

    async fn recent_group_messages(&self, limit: usize) -> BackendResult<Vec<GroupMessage>> {
        self.check()?;
        self.inner.recent_group_messages(limit).await
    }

    async fn insert_group_message(
        &self,
        author: UserId,
        message: String,
        mentions: Vec<UserId>,
    ) -> BackendResult<GroupMessage> {
        self.check()?;
        self.inner.insert_group_message(author, message, mentions).await
    }

    async fn insert_donation(&self, donation: NewDonation) -> BackendResult<Donation> {
        self.check()?;
        self.inner.insert_donation(donation).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.subscribe()
    }
}
