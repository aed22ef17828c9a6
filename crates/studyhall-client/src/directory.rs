//! Directory join pipeline.
//!
//! Rows in the social tables carry bare user ids.  Loaders collect the
//! distinct ids a batch references, fetch them from the `users` table in
//! one round-trip, and resolve each id to a [`UserRef`].  Ids with no
//! directory entry resolve to [`UserRef::Unknown`] instead of failing.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use studyhall_shared::constants::UNKNOWN_USER_NAME;
use studyhall_shared::UserId;
use studyhall_store::User;

use crate::backend::{BackendResult, RemoteBackend};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UserRef {
    Known {
        id: UserId,
        name: String,
        email: String,
    },
    Unknown {
        id: UserId,
    },
}

impl UserRef {
    pub fn id(&self) -> UserId {
        match self {
            Self::Known { id, .. } | Self::Unknown { id } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Known { name, .. } => name,
            Self::Unknown { .. } => UNKNOWN_USER_NAME,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Self::Known { email, .. } => email,
            Self::Unknown { .. } => "",
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known { .. })
    }
}

impl From<User> for UserRef {
    fn from(user: User) -> Self {
        Self::Known {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// A batch of directory entries fetched for one load.
#[derive(Debug, Default)]
pub struct Directory {
    entries: HashMap<UserId, User>,
}

impl Directory {
    /// Fetch the entries for every distinct id in `ids`.
    pub async fn fetch(
        backend: &dyn RemoteBackend,
        ids: impl IntoIterator<Item = UserId>,
    ) -> BackendResult<Self> {
        let distinct: Vec<UserId> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if distinct.is_empty() {
            return Ok(Self::default());
        }

        let users = backend.users_by_ids(&distinct).await?;
        if users.len() < distinct.len() {
            tracing::debug!(
                requested = distinct.len(),
                found = users.len(),
                "Some referenced users are missing from the directory"
            );
        }
        Ok(Self::from_users(users))
    }

    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            entries: users.into_iter().map(|u| (u.id, u)).collect(),
        }
    }

    pub fn resolve(&self, id: UserId) -> UserRef {
        match self.entries.get(&id) {
            Some(user) => UserRef::from(user.clone()),
            None => UserRef::Unknown { id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(name: &str) -> User {
        User {
            id: UserId::new(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let ada = user("Ada");
        let directory = Directory::from_users([ada.clone()]);

        let known = directory.resolve(ada.id);
        assert!(known.is_known());
        assert_eq!(known.name(), "Ada");
        assert_eq!(known.email(), "ada@example.com");

        let stranger = UserId::new();
        let unknown = directory.resolve(stranger);
        assert_eq!(unknown, UserRef::Unknown { id: stranger });
        assert_eq!(unknown.name(), "Unknown");
        assert_eq!(unknown.email(), "");
        assert_eq!(unknown.id(), stranger);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let id = UserId::new();
        let json = serde_json::to_value(UserRef::Unknown { id }).unwrap();
        assert_eq!(json["kind"], "unknown");
    }
}
