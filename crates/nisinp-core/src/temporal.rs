//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds precision,
//! and the whole-hour arithmetic the deadline engine is built on.
//!
//! ## Hour Arithmetic
//!
//! Elapsed time between two instants is counted in whole hours with
//! `floor(seconds / 3600)`. For non-negative spans this is plain truncation;
//! for an instant before the reference the result is negative and rounds
//! towards negative infinity, so a reference time in the future never counts
//! as "zero hours elapsed".
//!
//! ```text
//! reference ──────── 23h59m59s ────────▶ elapsed_hours = 23
//! reference ──────── 24h00m00s ────────▶ elapsed_hours = 24
//! ```

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const SECONDS_PER_HOUR: i64 = 3600;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an RFC 3339 string, converting any offset to UTC.
/// - [`Timestamp::from_epoch_secs()`] — from Unix seconds.
///
/// The current time is obtained from a [`crate::TimeSource`], never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// Any offset is accepted and converted to UTC. Incident dates are typed
    /// in by operators in their local timezone; the engine only ever compares
    /// instants.
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            EngineError::InvalidInput(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, EngineError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| EngineError::InvalidInput(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Whole hours elapsed from `reference` to `self`: `floor(Δseconds / 3600)`.
    ///
    /// Negative when `reference` lies after `self`.
    pub fn elapsed_hours_since(&self, reference: Timestamp) -> i64 {
        (self.epoch_secs() - reference.epoch_secs()).div_euclid(SECONDS_PER_HOUR)
    }

    /// This instant shifted forward by `hours`, or `None` past the
    /// representable range.
    pub fn checked_plus_hours(&self, hours: i64) -> Option<Self> {
        Duration::try_hours(hours)
            .and_then(|d| self.0.checked_add_signed(d))
            .map(Self)
    }

    /// This instant shifted back by `days`, or `None` before the
    /// representable range.
    pub fn checked_minus_days(&self, days: i64) -> Option<Self> {
        Duration::try_days(days)
            .and_then(|d| self.0.checked_sub_signed(d))
            .map(Self)
    }

    /// This instant shifted forward by `hours`, saturating at the bounds of
    /// the representable range.
    pub fn plus_hours(&self, hours: i64) -> Self {
        self.checked_plus_hours(hours)
            .unwrap_or_else(|| Self::saturated(hours))
    }

    /// This instant shifted forward by `secs` seconds, saturating.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Duration::try_seconds(secs)
            .and_then(|d| self.0.checked_add_signed(d))
            .map_or_else(|| Self::saturated(secs), Self)
    }

    /// This instant shifted back by `days`, saturating.
    pub fn minus_days(&self, days: i64) -> Self {
        self.checked_minus_days(days)
            .unwrap_or_else(|| Self::saturated(-days))
    }

    fn saturated(direction: i64) -> Self {
        if direction < 0 {
            Self(truncate_to_seconds(DateTime::<Utc>::MIN_UTC))
        } else {
            Self(truncate_to_seconds(DateTime::<Utc>::MAX_UTC))
        }
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Render the calendar date only (`YYYY-MM-DD`), as used in email bodies.
    pub fn to_date_string(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let dt_with_nanos = dt.with_nanosecond(123_456_789).unwrap();
        let t = Timestamp::from_utc(dt_with_nanos);
        assert_eq!(t.as_datetime().nanosecond(), 0);
        assert_eq!(t.to_iso8601(), "2026-01-15T12:30:45Z");
    }

    #[test]
    fn test_parse_converts_offset_to_utc() {
        let t = ts("2026-01-15T17:00:00+05:00");
        assert_eq!(t.to_iso8601(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("2026-01-15").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_elapsed_hours_truncates_partial_hour() {
        let reference = ts("2026-03-01T08:00:00Z");
        assert_eq!(ts("2026-03-02T07:59:59Z").elapsed_hours_since(reference), 23);
        assert_eq!(ts("2026-03-02T08:00:00Z").elapsed_hours_since(reference), 24);
        assert_eq!(ts("2026-03-02T08:59:59Z").elapsed_hours_since(reference), 24);
    }

    #[test]
    fn test_elapsed_hours_negative_floors() {
        let reference = ts("2026-03-01T08:00:00Z");
        assert_eq!(ts("2026-03-01T07:59:59Z").elapsed_hours_since(reference), -1);
        assert_eq!(ts("2026-03-01T08:00:00Z").elapsed_hours_since(reference), 0);
    }

    #[test]
    fn test_plus_hours_and_days() {
        let t = ts("2026-03-01T08:00:00Z");
        assert_eq!(t.plus_hours(24).to_iso8601(), "2026-03-02T08:00:00Z");
        assert_eq!(t.plus_secs(1).to_iso8601(), "2026-03-01T08:00:01Z");
        assert_eq!(t.minus_days(1).to_iso8601(), "2026-02-28T08:00:00Z");
    }

    #[test]
    fn test_date_string() {
        assert_eq!(ts("2026-06-30T23:59:59Z").to_date_string(), "2026-06-30");
    }

    #[test]
    fn test_epoch_roundtrip() {
        let t = ts("2026-01-15T12:00:00Z");
        assert_eq!(Timestamp::from_epoch_secs(t.epoch_secs()).unwrap(), t);
    }

    #[test]
    fn test_serde_roundtrip() {
        let t = ts("2026-01-15T12:00:00Z");
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(t, parsed);
    }

    #[test]
    fn test_out_of_range_shift() {
        let t = ts("2026-01-15T12:00:00Z");
        assert_eq!(t.checked_plus_hours(i64::from(u32::MAX)), None);
        assert_eq!(t.checked_plus_hours(i64::MAX), None);
        assert_eq!(t.checked_minus_days(i64::from(u32::MAX)), None);
        assert_eq!(t.checked_plus_hours(24), Some(ts("2026-01-16T12:00:00Z")));

        assert!(t.plus_hours(i64::from(u32::MAX)) > t);
        assert!(t.minus_days(i64::from(u32::MAX)) < t);
        assert_eq!(t.plus_hours(i64::MAX).as_datetime().nanosecond(), 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Adding whole hours to a reference is recovered exactly by the
        /// elapsed-hours computation, and one second less lands one hour short.
        #[test]
        fn elapsed_hours_inverts_plus_hours(base in 0i64..4_000_000_000, hours in 1i64..10_000) {
            let reference = Timestamp::from_epoch_secs(base).unwrap();
            let later = reference.plus_hours(hours);
            prop_assert_eq!(later.elapsed_hours_since(reference), hours);
            prop_assert_eq!(later.plus_secs(-1).elapsed_hours_since(reference), hours - 1);
        }
    }
}
