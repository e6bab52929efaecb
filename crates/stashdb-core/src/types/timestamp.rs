use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// TimestampError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TimestampError {
    #[error("timestamp parse error: {0}")]
    Parse(String),

    #[error("timestamp before epoch: {0}")]
    BeforeEpoch(String),
}

///
/// Timestamp
/// (in milliseconds since the Unix epoch)
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(u64::MIN);
    pub const MIN: Self = Self(u64::MIN);
    pub const MAX: Self = Self(u64::MAX);

    /// Construct from milliseconds.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Construct from seconds.
    #[must_use]
    pub const fn from_seconds(secs: u64) -> Self {
        Self(secs * 1_000)
    }

    /// Current wall-clock time.
    #[allow(clippy::cast_sign_loss)]
    #[must_use]
    pub fn now() -> Self {
        let ms = Utc::now().timestamp_millis();
        Self(if ms < 0 { 0 } else { ms as u64 })
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse an RFC 3339 timestamp into an absolute point in time.
    #[allow(clippy::cast_sign_loss)]
    pub fn parse_rfc3339(s: &str) -> Result<Self, TimestampError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TimestampError::Parse(format!("{s}: {e}")))?;
        let ms = dt.timestamp_millis();
        if ms < 0 {
            return Err(TimestampError::BeforeEpoch(s.to_string()));
        }

        Ok(Self(ms as u64))
    }
}

impl fmt::Display for Timestamp {
    #[allow(clippy::cast_possible_wrap)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0 as i64) {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl From<u64> for Timestamp {
    fn from(ms: u64) -> Self {
        Self(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_to_absolute_millis() {
        let ts = Timestamp::parse_rfc3339("1970-01-01T00:00:01Z").unwrap();
        assert_eq!(ts.get(), 1_000);

        let offset = Timestamp::parse_rfc3339("1970-01-01T01:00:01+01:00").unwrap();
        assert_eq!(offset, ts);
    }

    #[test]
    fn rejects_garbage_and_pre_epoch() {
        assert!(matches!(
            Timestamp::parse_rfc3339("not a time"),
            Err(TimestampError::Parse(_))
        ));
        assert!(matches!(
            Timestamp::parse_rfc3339("1950-01-01T00:00:00Z"),
            Err(TimestampError::BeforeEpoch(_))
        ));
    }

    #[test]
    fn ordering_follows_millis() {
        assert!(Timestamp::from_millis(1) < Timestamp::from_millis(2));
        assert_eq!(Timestamp::from_seconds(1), Timestamp::from_millis(1_000));
    }
}
