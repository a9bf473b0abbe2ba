//! Human-readable date and time for the playback cursor.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Date and clock strings for a query time in Unix seconds (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeReadout {
    /// e.g. `Aug 14, 2014`
    pub date: String,
    /// e.g. `06:05`
    pub clock: String,
}

impl TimeReadout {
    /// `None` when `seconds` is not finite or out of chrono's range.
    pub fn from_unix_seconds(seconds: f64) -> Option<Self> {
        let at = to_datetime(seconds)?;
        Some(Self {
            date: at.format("%b %d, %Y").to_string(),
            clock: at.format("%H:%M").to_string(),
        })
    }
}

pub fn to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
