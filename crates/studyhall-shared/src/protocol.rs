//! Change-notification vocabulary shared by the backend and its subscribers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

/// Every table that publishes change events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Friends,
    FriendRequests,
    StudySessions,
    GroupMessages,
    Donations,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Friends => "friends",
            Self::FriendRequests => "friend_requests",
            Self::StudySessions => "study_sessions",
            Self::GroupMessages => "group_messages",
            Self::Donations => "donations",
        }
    }
}

impl FromStr for Table {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Self::Users),
            "friends" => Ok(Self::Friends),
            "friend_requests" => Ok(Self::FriendRequests),
            "study_sessions" => Ok(Self::StudySessions),
            "group_messages" => Ok(Self::GroupMessages),
            "donations" => Ok(Self::Donations),
            other => Err(ParseError::Table(other.to_string())),
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single committed row change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// Primary key of the affected row.
    pub row_id: Uuid,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, row_id: Uuid) -> Self {
        Self { table, kind, row_id }
    }
}

/// Which events of a table a subscriber cares about (`*` or a single kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Only(ChangeKind),
}

impl EventFilter {
    pub fn accepts(&self, kind: ChangeKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(k) => *k == kind,
        }
    }
}

/// A table plus the event kinds watched on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub table: Table,
    pub filter: EventFilter,
}

impl Channel {
    pub fn all(table: Table) -> Self {
        Self {
            table,
            filter: EventFilter::All,
        }
    }

    pub fn inserts(table: Table) -> Self {
        Self {
            table,
            filter: EventFilter::Only(ChangeKind::Insert),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table && self.filter.accepts(event.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_only_channel() {
        let channel = Channel::inserts(Table::GroupMessages);
        let id = Uuid::new_v4();

        assert!(channel.matches(&ChangeEvent::new(Table::GroupMessages, ChangeKind::Insert, id)));
        assert!(!channel.matches(&ChangeEvent::new(Table::GroupMessages, ChangeKind::Delete, id)));
        assert!(!channel.matches(&ChangeEvent::new(Table::Friends, ChangeKind::Insert, id)));
    }

    #[test]
    fn test_table_names_parse_back() {
        for table in [
            Table::Users,
            Table::Friends,
            Table::FriendRequests,
            Table::StudySessions,
            Table::GroupMessages,
            Table::Donations,
        ] {
            assert_eq!(table.as_str().parse::<Table>().unwrap(), table);
        }
    }
}
