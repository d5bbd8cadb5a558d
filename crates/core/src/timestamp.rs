//! Nanosecond-precision effective time
//!
//! Every stored version of an entity carries the instant from which it is
//! valid. Instants are held as nanoseconds since the Unix epoch
//! (1970-01-01 00:00:00 UTC); the store's temporal precision decides how much
//! of that precision survives encoding.
//!
//! ```
//! use planb_core::Timestamp;
//!
//! let t = Timestamp::from_millis(1_500);
//! assert_eq!(t.as_nanos(), 1_500_000_000);
//! assert_eq!(t.as_secs(), 1);
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds since Unix epoch
///
/// ## Invariants
///
/// - Never before the epoch (u64)
/// - Totally ordered, so it can drive as-of lookups directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Maximum representable timestamp (year 2554)
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp for the current moment
    ///
    /// Returns the epoch if the system clock reads earlier than the epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
    }

    /// Create a timestamp from nanoseconds since epoch
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000_000))
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000_000))
    }

    /// Convert a chrono UTC date time
    ///
    /// Instants before the epoch or past [`Timestamp::MAX`] are rejected.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Result<Self> {
        datetime
            .timestamp_nanos_opt()
            .and_then(|nanos| u64::try_from(nanos).ok())
            .map(Timestamp)
            .ok_or_else(|| Error::TimeOutOfRange(datetime.to_rfc3339()))
    }

    /// Parse an RFC 3339 date time such as `2024-01-01T00:00:00.000Z`
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc3339(text.trim())
            .map_err(|_| Error::encoding("date", text))?;
        Self::from_datetime(parsed.with_timezone(&Utc))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Nanoseconds since Unix epoch
    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Milliseconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Seconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// The same instant as a chrono date time
    pub fn to_datetime(&self) -> DateTime<Utc> {
        // i64 nanoseconds cover every u64 value below 2262; beyond that we
        // fall back to second resolution.
        match i64::try_from(self.0) {
            Ok(nanos) => DateTime::from_timestamp_nanos(nanos),
            Err(_) => DateTime::from_timestamp(self.as_secs() as i64, (self.0 % 1_000_000_000) as u32)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    // =========================================================================
    // Duration Operations
    // =========================================================================

    /// Add a duration, saturating at [`Timestamp::MAX`]
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(nanos))
    }

    /// Subtract a duration, saturating at [`Timestamp::EPOCH`]
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_sub(nanos))
    }

    /// Check if this timestamp is before another
    #[inline]
    pub fn is_before(&self, other: Timestamp) -> bool {
        self.0 < other.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_datetime().to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    /// Clamps instants outside the representable range
    fn from(datetime: DateTime<Utc>) -> Self {
        Timestamp::from_datetime(datetime).unwrap_or(if datetime.timestamp() < 0 {
            Timestamp::EPOCH
        } else {
            Timestamp::MAX
        })
    }
}

impl From<Duration> for Timestamp {
    /// Create from duration since epoch
    fn from(duration: Duration) -> Self {
        Timestamp::EPOCH.saturating_add(duration)
    }
}
