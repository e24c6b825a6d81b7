//! Measurement - the result of a single probe.

use std::fmt;

use chrono::{Local, NaiveDateTime, Timelike};

use crate::LogRecord;

/// The outcome of one reachability check.
///
/// `latency` is the round-trip time in milliseconds, or `None` when the
/// target did not answer. Timestamps are local wall-clock time because the
/// durable log carries no zone information.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    /// When the probe completed.
    pub timestamp: NaiveDateTime,
    /// Round-trip latency in milliseconds.
    pub latency: Option<f64>,
}

impl Measurement {
    /// Create a measurement with an explicit timestamp.
    pub fn new(timestamp: NaiveDateTime, latency: Option<f64>) -> Self {
        Self { timestamp, latency }
    }

    /// A successful probe observed now.
    pub fn reachable(latency_ms: f64) -> Self {
        Self::new(now(), Some(latency_ms))
    }

    /// A failed probe observed now.
    pub fn unreachable() -> Self {
        Self::new(now(), None)
    }

    /// Whether the target answered.
    pub fn is_success(&self) -> bool {
        self.latency.is_some()
    }

    /// Render the durable log line for this measurement.
    pub fn to_log_line(&self) -> String {
        LogRecord::Measurement(*self).to_string()
    }
}

/// Short form used in history listings.
///
/// ```rust
/// use chrono::NaiveDate;
/// use pingwatch_types::Measurement;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 30, 0).unwrap();
/// assert_eq!(Measurement::new(ts, Some(9.5)).to_string(), "[08:30:00] 9.50 ms");
/// assert_eq!(Measurement::new(ts, None).to_string(), "[08:30:00] NO RESPONSE");
/// ```
impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.timestamp.format("%H:%M:%S");
        match self.latency {
            Some(ms) => write!(f, "[{}] {:.2} ms", time, ms),
            None => write!(f, "[{}] NO RESPONSE", time),
        }
    }
}

/// Current local time truncated to whole seconds, matching log resolution.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
