//! Types shared by the studyhall backend and client crates.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::ParseError;
pub use protocol::{ChangeEvent, ChangeKind, Channel, EventFilter, Table};
pub use types::{RequestStatus, StudyStatus, UserId};
