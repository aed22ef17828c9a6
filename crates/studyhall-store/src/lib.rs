//! # studyhall-store
//!
//! Relational backend for the Studyhall social layer, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed row-level operations for the
//! directory, friend links, friend requests, presence sessions, the group
//! feed and donations.  Every committed write is announced on the
//! database's [`ChangeFeed`].

pub mod database;
pub mod donations;
pub mod feed;
pub mod friend_requests;
pub mod friends;
pub mod group_messages;
pub mod migrations;
pub mod models;
pub mod sessions;
pub mod users;

mod error;
mod rows;

pub use database::Database;
pub use error::{Result, StoreError};
pub use feed::ChangeFeed;
pub use models::*;
