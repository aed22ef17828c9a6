use studyhall_shared::{RequestStatus, UserId};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::BackendError;

/// Why a sync-layer mutation did not happen.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session has ended")]
    SignedOut,

    #[error("No user registered with email {0}")]
    UserNotFound(String),

    #[error("Cannot send a friend request to yourself")]
    SelfRequest,

    #[error("Already friends with {0}")]
    AlreadyFriends(UserId),

    #[error("A friend request to {0} is already pending")]
    RequestAlreadyPending(UserId),

    #[error("Friend request {0} not found")]
    RequestNotFound(Uuid),

    #[error("Friend request {0} is addressed to another user")]
    NotRecipient(Uuid),

    #[error("Friend request {id} is already {status}")]
    RequestNotPending { id: Uuid, status: RequestStatus },

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message exceeds {max} characters")]
    MessageTooLong { max: usize },
}

#[derive(Error, Debug)]
pub enum DonationError {
    #[error("Donor name is required")]
    EmptyName,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Donation amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Message exceeds {max} characters")]
    MessageTooLong { max: usize },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
