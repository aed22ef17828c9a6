//! Controller-owned in-memory copies of the remote collections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use studyhall_store::{FriendLink, FriendRequest, GroupMessage, StudySession};

use crate::directory::UserRef;

/// The four mirrored collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Friends,
    FriendRequests,
    Presence,
    Messages,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Friends,
        Collection::FriendRequests,
        Collection::Presence,
        Collection::Messages,
    ];

    fn index(self) -> usize {
        match self {
            Self::Friends => 0,
            Self::FriendRequests => 1,
            Self::Presence => 2,
            Self::Messages => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Friends => "friends",
            Self::FriendRequests => "friend_requests",
            Self::Presence => "presence",
            Self::Messages => "messages",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendEntry {
    pub link: FriendLink,
    pub friend: UserRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub request: FriendRequest,
    pub sender: UserRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub session: StudySession,
    pub user: UserRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    pub message: GroupMessage,
    pub author: UserRef,
}

/// A consistent snapshot of all four mirrors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mirrors {
    pub friends: Vec<FriendEntry>,
    pub friend_requests: Vec<IncomingRequest>,
    pub presence: Vec<PresenceEntry>,
    /// Oldest first.
    pub messages: Vec<FeedMessage>,
}

#[derive(Debug, Default)]
struct State {
    mirrors: Mirrors,
    /// Ticket of the last load applied per collection.
    applied: [u64; 4],
    is_loading: bool,
    /// Set once the session ends; no load is applied after that.
    closed: bool,
}

/// Mirrors plus the generation tickets guarding them.
///
/// A loader takes a ticket before it fetches; its result is applied only if
/// no load of the same collection holding a later ticket got there first,
/// and only while the store is open.  The lock is never held across an
/// await.
#[derive(Debug, Default)]
pub struct MirrorStore {
    state: RwLock<State>,
    tickets: [AtomicU64; 4],
}

impl MirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self, collection: Collection) -> u64 {
        self.tickets[collection.index()].fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `update` if the store is open and `ticket` is newer than the
    /// last applied load. Returns whether it was applied.
    pub fn apply(
        &self,
        collection: Collection,
        ticket: u64,
        update: impl FnOnce(&mut Mirrors),
    ) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }
        let applied = &mut state.applied[collection.index()];
        if ticket <= *applied {
            return false;
        }
        *applied = ticket;
        update(&mut state.mirrors);
        true
    }

    /// Empty every mirror, invalidate loads already in flight and refuse
    /// any later ones.
    pub fn close(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for collection in Collection::ALL {
            let i = collection.index();
            state.applied[i] = self.tickets[i].load(Ordering::SeqCst);
        }
        state.mirrors = Mirrors::default();
        state.is_loading = false;
        state.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    pub fn set_loading(&self, loading: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.is_loading = loading && !state.closed;
    }

    pub fn is_loading(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_loading
    }

    pub fn read<T>(&self, f: impl FnOnce(&Mirrors) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state.mirrors)
    }

    pub fn snapshot(&self) -> Mirrors {
        self.read(Mirrors::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_ticket_is_discarded() {
        let store = MirrorStore::new();
        let early = store.ticket(Collection::Messages);
        let late = store.ticket(Collection::Messages);

        assert!(store.apply(Collection::Messages, late, |m| m.messages.clear()));
        assert!(!store.apply(Collection::Messages, early, |_| {
            panic!("stale result applied")
        }));
    }

    #[test]
    fn test_tickets_are_per_collection() {
        let store = MirrorStore::new();
        let friends = store.ticket(Collection::Friends);
        let _ = store.ticket(Collection::Presence);
        let _ = store.ticket(Collection::Presence);

        assert!(store.apply(Collection::Friends, friends, |_| {}));
    }

    #[test]
    fn test_close_refuses_in_flight_and_later_loads() {
        let store = MirrorStore::new();
        let in_flight = store.ticket(Collection::Friends);
        store.set_loading(true);

        store.close();

        assert!(store.is_closed());
        assert!(!store.apply(Collection::Friends, in_flight, |_| {}));
        assert!(!store.is_loading());
        assert_eq!(store.snapshot(), Mirrors::default());

        let next = store.ticket(Collection::Friends);
        assert!(!store.apply(Collection::Friends, next, |_| {
            panic!("closed store accepted a reload")
        }));
        store.set_loading(true);
        assert!(!store.is_loading());
    }
}
