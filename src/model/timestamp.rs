use std::convert::TryFrom;
use std::time::Duration;

use chrono::prelude::*;

use crate::error::{Error, ErrorKind, Result};

// Unix timestamp in milliseconds.
pub type Timestamp = i64;

// Unix timestamp in seconds, the resolution OpenTSDB queries are issued in.
pub type EpochSeconds = i64;

// Same bounds as Prometheus' minTime/maxTime, so any accepted second still
// fits a millisecond Timestamp.
pub const MIN_TIME: EpochSeconds = i64::MIN / 1000 + 62_135_596_801;
pub const MAX_TIME: EpochSeconds = i64::MAX / 1000 - 62_135_596_801;

/// Inclusive query bounds in epoch seconds.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TimeRange {
    start: EpochSeconds,
    end: EpochSeconds,
}

impl TimeRange {
    pub fn new(start: EpochSeconds, end: EpochSeconds) -> Result<Self> {
        if start > end {
            return Err("end time is before start time".into());
        }
        Ok(Self { start, end })
    }

    /// Converts millisecond bounds, widening to whole seconds.
    /// Engines pass `i64::MIN`/`i64::MAX` for open bounds.
    pub fn from_millis(mint: Timestamp, maxt: Timestamp) -> Result<Self> {
        let end = maxt.div_euclid(1000) + if maxt.rem_euclid(1000) > 0 { 1 } else { 0 };
        Self::new(mint.div_euclid(1000), end)
    }

    /// The `lookback` seconds leading up to now.
    pub fn last(lookback: Duration) -> Result<Self> {
        Self::with_defaults(None, None, lookback)
    }

    /// Fills in missing bounds: `end` defaults to now and `start` to
    /// `lookback` before `end`.
    pub fn with_defaults(
        start: Option<EpochSeconds>,
        end: Option<EpochSeconds>,
        lookback: Duration,
    ) -> Result<Self> {
        let end = end.unwrap_or_else(|| Utc::now().timestamp());
        let start = match start {
            Some(start) => start,
            None => i64::try_from(lookback.as_secs())
                .ok()
                .and_then(|secs| end.checked_sub(secs))
                .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "lookback out of range"))?,
        };
        Self::new(start, end)
    }

    #[inline]
    pub fn start(&self) -> EpochSeconds {
        self.start
    }

    #[inline]
    pub fn end(&self) -> EpochSeconds {
        self.end
    }
}

/// Accepts RFC 3339 or (possibly fractional) epoch seconds, as the
/// Prometheus HTTP API does.
pub fn parse_time(s: &str) -> Result<EpochSeconds> {
    if let Ok(secs) = s.parse::<f64>() {
        let secs = secs.floor();
        if !secs.is_finite() || secs < MIN_TIME as f64 || secs > MAX_TIME as f64 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                &format!("cannot parse {:?} to a valid timestamp", s),
            ));
        }
        return Ok(secs as EpochSeconds);
    }

    DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp())
        .map_err(|e| ("timestamp parsing failed", e).into())
}
