//! # Temporal Types — UTC Timestamps and Clocks
//!
//! `Timestamp` is a UTC-only instant truncated to millisecond precision.
//! Its string form is `YYYY-MM-DDTHH:MM:SS.mmmZ`: fixed width, so the
//! lexicographic order of rendered timestamps equals their chronological
//! order. Update-history sort keys and the rollback window comparisons rely
//! on that property.
//!
//! Engines obtain "now" from a [`Clock`] rather than `Utc::now()`, so tests
//! and the rollback time budget can run against a [`ManualClock`].

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// From a `chrono::DateTime<Utc>`, truncating below milliseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_millis(dt))
    }

    /// Midnight UTC at the start of `date`.
    pub fn start_of_day(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN).and_utc())
    }

    /// Parse an RFC 3339 string with a `Z` suffix.
    ///
    /// Explicit offsets (even `+00:00`) are rejected.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp {
                value: s.to_string(),
                reason: "timestamp must use Z suffix (UTC only)".to_string(),
            });
        }
        Self::parse_lenient(s)
    }

    /// Parse any RFC 3339 string, converting the offset to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| CoreError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Calendar date (UTC) of this instant.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Signed duration `self - earlier`.
    pub fn signed_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.signed_duration_since(earlier.0)
    }

    /// `self + delta`, or `None` on overflow.
    pub fn checked_add(&self, delta: Duration) -> Option<Timestamp> {
        self.0.checked_add_signed(delta).map(Self::from_utc)
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_lenient(&raw).map_err(serde::de::Error::custom)
    }
}

fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    let millis = dt.nanosecond() / 1_000_000 * 1_000_000;
    dt.with_nanosecond(millis).unwrap_or(dt)
}

// ─── Clocks ──────────────────────────────────────────────────────────

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
///
/// Each call to [`Clock::now`] advances the clock by `tick` (zero by
/// default) after reading, so successive writes can get distinct,
/// increasing timestamps without the caller managing time explicitly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug)]
struct ManualClockState {
    current: Timestamp,
    tick: Duration,
}

impl ManualClock {
    /// A clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualClockState {
                current: start,
                tick: Duration::zero(),
            })),
        }
    }

    /// A clock that advances by `tick` after every read.
    pub fn ticking(start: Timestamp, tick: Duration) -> Self {
        let clock = Self::new(start);
        clock.state.lock().tick = tick;
        clock
    }

    /// Move the clock to `to`.
    pub fn set(&self, to: Timestamp) {
        self.state.lock().current = to;
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.state.lock();
        if let Some(next) = state.current.checked_add(delta) {
            state.current = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut state = self.state.lock();
        let now = state.current;
        if let Some(next) = now.checked_add(state.tick) {
            state.current = next;
        }
        now
    }
}
