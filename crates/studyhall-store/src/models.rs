//! Row structs for every table in the backend.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studyhall_shared::{RequestStatus, StudyStatus, UserId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A directory entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Lower-cased, unique across the directory.
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Friend link
// ---------------------------------------------------------------------------

/// One direction of a friendship: `user_id` has `friend_id` as a friend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendLink {
    pub id: Uuid,
    pub user_id: UserId,
    pub friend_id: UserId,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Friend request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Study session
// ---------------------------------------------------------------------------

/// Presence row. There is at most one per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: UserId,
    pub status: StudyStatus,
    pub subject: Option<String>,
    /// When the current status was entered.
    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Group message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMessage {
    pub id: Uuid,
    pub user_id: UserId,
    pub message: String,
    pub mentions: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Donation
// ---------------------------------------------------------------------------

/// A recorded donation, shown back to the donor as an acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Donation {
    pub id: Uuid,
    pub donor_name: String,
    pub email: String,
    /// Amount in minor currency units.
    pub amount_cents: i64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the donor; id and timestamp are assigned on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDonation {
    pub donor_name: String,
    pub email: String,
    pub amount_cents: i64,
    pub message: Option<String>,
}
