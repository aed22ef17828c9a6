//! Column conversion helpers shared by the per-table modules.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use studyhall_shared::UserId;
use uuid::Uuid;

use crate::error::StoreError;

/// Timestamps are stored at fixed nanosecond width so that text ordering
/// matches chronological ordering.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_user_id(idx: usize, s: &str) -> rusqlite::Result<UserId> {
    parse_uuid(idx, s).map(UserId)
}

pub(crate) fn parse_enum<T>(idx: usize, s: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// `?, ?, ?` for an `IN (...)` clause of `n` parameters.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) fn map_not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_width_timestamps_sort_chronologically() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();
        let later = whole + chrono::Duration::nanoseconds(1);

        let a = fmt_ts(&whole);
        let b = fmt_ts(&later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_ts(0, &b).unwrap(), later);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
