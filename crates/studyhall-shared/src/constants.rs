/// Application name
pub const APP_NAME: &str = "Studyhall";

/// Number of most recent group messages kept in the feed mirror
pub const GROUP_FEED_WINDOW: usize = 50;

/// Display name used when a referenced user is missing from the directory
pub const UNKNOWN_USER_NAME: &str = "Unknown";

/// Maximum group message length in characters
pub const MAX_MESSAGE_LEN: usize = 2_000;

/// Maximum donor message length in characters
pub const MAX_DONATION_MESSAGE_LEN: usize = 500;

/// Default capacity of the change-feed broadcast buffer
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "studyhall.db";
