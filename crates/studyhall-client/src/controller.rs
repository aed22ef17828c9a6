//! Synchronization controller.
//!
//! [`SyncController`] owns the four mirrors for one signed-in user.  It
//! bulk-loads them on [`start`](SyncController::start), keeps them fresh by
//! re-running a collection's loader on every matching change notification,
//! and exposes the six mutations.  Each mutation writes, then reloads the
//! collections it touched before returning.
//!
//! Loaders never surface errors: a failed fetch is logged and the previous
//! mirror stays in place.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use studyhall_shared::constants::MAX_MESSAGE_LEN;
use studyhall_shared::{ChangeEvent, Channel, RequestStatus, StudyStatus, Table, UserId};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{BackendError, RemoteBackend};
use crate::directory::Directory;
use crate::error::SyncError;
use crate::events::{emit_event, MirrorEvent};
use crate::listener::Subscription;
use crate::mirrors::{
    Collection, FeedMessage, FriendEntry, IncomingRequest, MirrorStore, Mirrors, PresenceEntry,
};

const MIRROR_EVENT_CAPACITY: usize = 64;

pub struct SyncController {
    inner: Arc<Inner>,
    subscriptions: Mutex<Vec<Subscription>>,
}

struct Inner {
    backend: Arc<dyn RemoteBackend>,
    user: UserId,
    feed_window: usize,
    mirrors: MirrorStore,
    events: broadcast::Sender<MirrorEvent>,
}

impl SyncController {
    pub fn new(backend: Arc<dyn RemoteBackend>, user: UserId, feed_window: usize) -> Self {
        let (events, _) = broadcast::channel(MIRROR_EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                backend,
                user,
                feed_window,
                mirrors: MirrorStore::new(),
                events,
            }),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.inner.user
    }

    /// Bulk-load every collection, then start listening for changes.
    ///
    /// Feed receivers are taken before loading so writes landing during the
    /// load still trigger a reload afterwards.
    pub async fn start(&self) {
        if self.inner.mirrors.is_closed() {
            warn!(user = %self.inner.user, "Start after teardown ignored");
            return;
        }
        let receivers: Vec<_> = watched_channels()
            .into_iter()
            .map(|(channel, reloads)| (channel, reloads, self.inner.backend.subscribe()))
            .collect();

        self.load_all().await;

        let subs = receivers
            .into_iter()
            .map(|(channel, reloads, rx)| self.listen(channel, rx, reloads))
            .collect::<Vec<_>>();

        let mut guard = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.clear();
        guard.extend(subs);
        info!(user = %self.inner.user, subscriptions = guard.len(), "Sync controller started");
    }

    /// Run all four loaders concurrently with `is_loading` set.
    pub async fn load_all(&self) {
        let inner = &self.inner;
        inner.mirrors.set_loading(true);
        tokio::join!(
            inner.reload_friends(),
            inner.reload_friend_requests(),
            inner.reload_presence(),
            inner.reload_messages(),
        );
        inner.mirrors.set_loading(false);
    }

    /// Drop every subscription and clear all mirrors. The controller is
    /// finished afterwards: reloads are discarded and mutations fail with
    /// [`SyncError::SignedOut`].
    pub fn teardown(&self) {
        let dropped = {
            let mut guard = self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        let count = dropped.len();
        drop(dropped);

        self.inner.mirrors.close();
        emit_event(&self.inner.events, MirrorEvent::Cleared);
        info!(user = %self.inner.user, subscriptions = count, "Sync controller torn down");
    }

    fn listen(
        &self,
        channel: Channel,
        rx: broadcast::Receiver<ChangeEvent>,
        reloads: &'static [Collection],
    ) -> Subscription {
        let weak = Arc::downgrade(&self.inner);
        Subscription::spawn(channel, rx, move || {
            let weak = Weak::clone(&weak);
            async move {
                // Controller gone: stop listening.
                let Some(inner) = weak.upgrade() else {
                    return false;
                };
                for &collection in reloads {
                    inner.reload(collection).await;
                }
                true
            }
        })
    }

    // -- snapshots --

    pub fn friends(&self) -> Vec<FriendEntry> {
        self.inner.mirrors.read(|m| m.friends.clone())
    }

    pub fn friend_requests(&self) -> Vec<IncomingRequest> {
        self.inner.mirrors.read(|m| m.friend_requests.clone())
    }

    pub fn presence(&self) -> Vec<PresenceEntry> {
        self.inner.mirrors.read(|m| m.presence.clone())
    }

    pub fn messages(&self) -> Vec<FeedMessage> {
        self.inner.mirrors.read(|m| m.messages.clone())
    }

    pub fn snapshot(&self) -> Mirrors {
        self.inner.mirrors.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.mirrors.is_loading()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MirrorEvent> {
        self.inner.events.subscribe()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.is_active())
            .count()
    }

    // -- reloads --

    pub async fn reload(&self, collection: Collection) {
        self.inner.reload(collection).await;
    }

    // -- mutations --

    pub async fn send_friend_request(&self, email: &str) -> Result<(), SyncError> {
        let result = self.inner.send_friend_request(email).await;
        log_outcome("send_friend_request", &result);
        result
    }

    pub async fn accept_friend_request(&self, request_id: Uuid) -> Result<(), SyncError> {
        let result = self.inner.accept_friend_request(request_id).await;
        log_outcome("accept_friend_request", &result);
        result
    }

    pub async fn reject_friend_request(&self, request_id: Uuid) -> Result<(), SyncError> {
        let result = self.inner.reject_friend_request(request_id).await;
        log_outcome("reject_friend_request", &result);
        result
    }

    pub async fn remove_friend(&self, friend_id: UserId) -> Result<(), SyncError> {
        let result = self.inner.remove_friend(friend_id).await;
        log_outcome("remove_friend", &result);
        result
    }

    pub async fn update_study_status(
        &self,
        status: StudyStatus,
        subject: Option<&str>,
    ) -> Result<(), SyncError> {
        let result = self.inner.update_study_status(status, subject).await;
        log_outcome("update_study_status", &result);
        result
    }

    pub async fn send_group_message(
        &self,
        text: &str,
        mentions: &[UserId],
    ) -> Result<(), SyncError> {
        let result = self.inner.send_group_message(text, mentions).await;
        log_outcome("send_group_message", &result);
        result
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        debug!(user = %self.inner.user, "Sync controller dropped");
    }
}

/// Channels the controller listens on and the collections each one reloads.
/// The friend set feeds the presence query, so link changes reload both.
fn watched_channels() -> [(Channel, &'static [Collection]); 4] {
    [
        (
            Channel::all(Table::Friends),
            &[Collection::Friends, Collection::Presence],
        ),
        (
            Channel::all(Table::FriendRequests),
            &[Collection::FriendRequests],
        ),
        (Channel::all(Table::StudySessions), &[Collection::Presence]),
        (
            Channel::inserts(Table::GroupMessages),
            &[Collection::Messages],
        ),
    ]
}

fn log_outcome(op: &'static str, result: &Result<(), SyncError>) {
    match result {
        Ok(()) => debug!(op, "Operation completed"),
        Err(e) => warn!(op, error = %e, "Operation failed"),
    }
}

impl Inner {
    fn ensure_open(&self) -> Result<(), SyncError> {
        if self.mirrors.is_closed() {
            return Err(SyncError::SignedOut);
        }
        Ok(())
    }

    async fn reload(&self, collection: Collection) {
        match collection {
            Collection::Friends => self.reload_friends().await,
            Collection::FriendRequests => self.reload_friend_requests().await,
            Collection::Presence => self.reload_presence().await,
            Collection::Messages => self.reload_messages().await,
        }
    }

    fn load_failed(&self, collection: Collection, step: &'static str, error: BackendError) {
        warn!(
            collection = collection.as_str(),
            step,
            error = %error,
            "Reload failed, keeping previous mirror"
        );
    }

    fn commit(&self, collection: Collection, ticket: u64, update: impl FnOnce(&mut Mirrors)) {
        if self.mirrors.apply(collection, ticket, update) {
            emit_event(&self.events, MirrorEvent::Reloaded(collection));
        } else {
            debug!(collection = collection.as_str(), ticket, "Discarding stale reload");
        }
    }

    async fn reload_friends(&self) {
        let collection = Collection::Friends;
        let ticket = self.mirrors.ticket(collection);

        let links = match self.backend.friend_links(self.user).await {
            Ok(links) => links,
            Err(e) => return self.load_failed(collection, "friends", e),
        };
        let directory =
            match Directory::fetch(self.backend.as_ref(), links.iter().map(|l| l.friend_id)).await
            {
                Ok(directory) => directory,
                Err(e) => return self.load_failed(collection, "directory", e),
            };

        let entries = links
            .into_iter()
            .map(|link| FriendEntry {
                friend: directory.resolve(link.friend_id),
                link,
            })
            .collect();
        self.commit(collection, ticket, |m| m.friends = entries);
    }

    async fn reload_friend_requests(&self) {
        let collection = Collection::FriendRequests;
        let ticket = self.mirrors.ticket(collection);

        let requests = match self.backend.pending_requests_for(self.user).await {
            Ok(requests) => requests,
            Err(e) => return self.load_failed(collection, "friend_requests", e),
        };
        let directory =
            match Directory::fetch(self.backend.as_ref(), requests.iter().map(|r| r.sender_id))
                .await
            {
                Ok(directory) => directory,
                Err(e) => return self.load_failed(collection, "directory", e),
            };

        let entries = requests
            .into_iter()
            .map(|request| IncomingRequest {
                sender: directory.resolve(request.sender_id),
                request,
            })
            .collect();
        self.commit(collection, ticket, |m| m.friend_requests = entries);
    }

    async fn reload_presence(&self) {
        let collection = Collection::Presence;
        let ticket = self.mirrors.ticket(collection);

        let links = match self.backend.friend_links(self.user).await {
            Ok(links) => links,
            Err(e) => return self.load_failed(collection, "friends", e),
        };
        let mut users: Vec<UserId> = links.iter().map(|l| l.friend_id).collect();
        users.push(self.user);

        let sessions = match self.backend.study_sessions(&users).await {
            Ok(sessions) => sessions,
            Err(e) => return self.load_failed(collection, "study_sessions", e),
        };
        let directory =
            match Directory::fetch(self.backend.as_ref(), sessions.iter().map(|s| s.user_id)).await
            {
                Ok(directory) => directory,
                Err(e) => return self.load_failed(collection, "directory", e),
            };

        let entries = sessions
            .into_iter()
            .map(|session| PresenceEntry {
                user: directory.resolve(session.user_id),
                session,
            })
            .collect();
        self.commit(collection, ticket, |m| m.presence = entries);
    }

    async fn reload_messages(&self) {
        let collection = Collection::Messages;
        let ticket = self.mirrors.ticket(collection);

        let mut messages = match self.backend.recent_group_messages(self.feed_window).await {
            Ok(messages) => messages,
            Err(e) => return self.load_failed(collection, "group_messages", e),
        };
        let directory =
            match Directory::fetch(self.backend.as_ref(), messages.iter().map(|m| m.user_id)).await
            {
                Ok(directory) => directory,
                Err(e) => return self.load_failed(collection, "directory", e),
            };

        // Fetched newest first; the feed reads oldest first.
        messages.reverse();
        let entries = messages
            .into_iter()
            .map(|message| FeedMessage {
                author: directory.resolve(message.user_id),
                message,
            })
            .collect();
        self.commit(collection, ticket, |m| m.messages = entries);
    }

    async fn send_friend_request(&self, email: &str) -> Result<(), SyncError> {
        self.ensure_open()?;
        let email = email.trim();
        let target = self
            .backend
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| SyncError::UserNotFound(email.to_string()))?;

        if target.id == self.user {
            return Err(SyncError::SelfRequest);
        }
        if self.backend.friendship_exists(self.user, target.id).await? {
            return Err(SyncError::AlreadyFriends(target.id));
        }
        if self
            .backend
            .pending_request_exists(self.user, target.id)
            .await?
        {
            return Err(SyncError::RequestAlreadyPending(target.id));
        }

        self.ensure_open()?;
        let request = self
            .backend
            .insert_friend_request(self.user, target.id)
            .await?;
        info!(request = %request.id, to = %target.id, "Friend request sent");
        Ok(())
    }

    /// Fetch a request addressed to this user that is still pending.
    async fn pending_request_for_me(
        &self,
        request_id: Uuid,
    ) -> Result<studyhall_store::FriendRequest, SyncError> {
        let request = self
            .backend
            .friend_request(request_id)
            .await?
            .ok_or(SyncError::RequestNotFound(request_id))?;

        if request.receiver_id != self.user {
            return Err(SyncError::NotRecipient(request_id));
        }
        if request.status != RequestStatus::Pending {
            return Err(SyncError::RequestNotPending {
                id: request_id,
                status: request.status,
            });
        }
        Ok(request)
    }

    async fn accept_friend_request(&self, request_id: Uuid) -> Result<(), SyncError> {
        self.ensure_open()?;
        let request = self.pending_request_for_me(request_id).await?;
        self.ensure_open()?;
        self.backend.accept_friend_request(request.id).await?;
        info!(request = %request.id, from = %request.sender_id, "Friend request accepted");

        tokio::join!(
            self.reload_friends(),
            self.reload_friend_requests(),
            self.reload_presence(),
        );
        Ok(())
    }

    async fn reject_friend_request(&self, request_id: Uuid) -> Result<(), SyncError> {
        self.ensure_open()?;
        let request = self.pending_request_for_me(request_id).await?;
        self.ensure_open()?;
        self.backend
            .set_request_status(request.id, RequestStatus::Rejected)
            .await?;
        info!(request = %request.id, from = %request.sender_id, "Friend request rejected");

        self.reload_friend_requests().await;
        Ok(())
    }

    async fn remove_friend(&self, friend_id: UserId) -> Result<(), SyncError> {
        self.ensure_open()?;
        let removed = self.backend.delete_friendship(self.user, friend_id).await?;
        info!(friend = %friend_id, removed, "Friendship removed");

        tokio::join!(self.reload_friends(), self.reload_presence());
        Ok(())
    }

    async fn update_study_status(
        &self,
        status: StudyStatus,
        subject: Option<&str>,
    ) -> Result<(), SyncError> {
        self.ensure_open()?;
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let session = self
            .backend
            .upsert_study_session(self.user, status, subject)
            .await?;
        debug!(status = %session.status, last_active = %session.last_active, "Study status updated");

        self.reload_presence().await;
        Ok(())
    }

    async fn send_group_message(&self, text: &str, mentions: &[UserId]) -> Result<(), SyncError> {
        self.ensure_open()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SyncError::EmptyMessage);
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(SyncError::MessageTooLong {
                max: MAX_MESSAGE_LEN,
            });
        }

        let mut mentions = mentions.to_vec();
        mentions.sort();
        mentions.dedup();

        let message = self
            .backend
            .insert_group_message(self.user, text.to_string(), mentions)
            .await?;
        debug!(message = %message.id, "Group message sent");

        self.reload_messages().await;
        Ok(())
    }
}
