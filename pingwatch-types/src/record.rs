//! Log record codec.
//!
//! Every line of the durable log is one of:
//!
//! ```text
//! [2024-05-01 12:00:00] Latency: 14.20 ms
//! [2024-05-01 12:00:30] Latency: NO RESPONSE
//! [2024-05-01 12:00:30] ERROR: Network recovered
//! ```
//!
//! Only the first two forms carry measurements. `ERROR:` lines record events
//! such as alerts and recoveries and are ignored when history is rebuilt.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::{Measurement, TIMESTAMP_FORMAT};

const LATENCY_PREFIX: &str = "Latency: ";
const ERROR_PREFIX: &str = "ERROR: ";
const NO_RESPONSE: &str = "NO RESPONSE";
const MS_SUFFIX: &str = " ms";

/// Errors produced when a line does not match the log grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line does not start with a bracketed timestamp.
    #[error("missing bracketed timestamp")]
    MissingTimestamp,

    /// The bracketed text is not `YYYY-MM-DD HH:MM:SS`.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The body is neither a latency nor an error record.
    #[error("unrecognized record body: {0}")]
    UnknownBody(String),

    /// The latency value is not a finite, non-negative number of milliseconds.
    #[error("invalid latency: {0}")]
    InvalidLatency(String),
}

/// One line of the durable log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// A probe result.
    Measurement(Measurement),
    /// A free-text event.
    Event {
        timestamp: NaiveDateTime,
        message: String,
    },
}

impl LogRecord {
    /// An event record stamped with the current time.
    pub fn event(message: impl Into<String>) -> Self {
        LogRecord::Event {
            timestamp: crate::now(),
            message: message.into(),
        }
    }

    /// Timestamp of the record.
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            LogRecord::Measurement(m) => m.timestamp,
            LogRecord::Event { timestamp, .. } => *timestamp,
        }
    }

    /// The measurement carried by this record, if any.
    pub fn into_measurement(self) -> Option<Measurement> {
        match self {
            LogRecord::Measurement(m) => Some(m),
            LogRecord::Event { .. } => None,
        }
    }

    /// Parse a line, returning `None` for anything that is not a measurement.
    ///
    /// This is the lenient entry point used when replaying a log: error
    /// records, blank lines and garbage all yield `None`.
    pub fn parse_measurement(line: &str) -> Option<Measurement> {
        line.parse::<LogRecord>().ok()?.into_measurement()
    }
}

impl FromStr for LogRecord {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let rest = line.strip_prefix('[').ok_or(ParseError::MissingTimestamp)?;
        let (stamp, body) = rest.split_once("] ").ok_or(ParseError::MissingTimestamp)?;

        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .map_err(|_| ParseError::InvalidTimestamp(stamp.to_string()))?;

        if let Some(message) = body.strip_prefix(ERROR_PREFIX) {
            return Ok(LogRecord::Event {
                timestamp,
                message: message.to_string(),
            });
        }

        let value = body
            .strip_prefix(LATENCY_PREFIX)
            .ok_or_else(|| ParseError::UnknownBody(body.to_string()))?;

        if value == NO_RESPONSE {
            return Ok(LogRecord::Measurement(Measurement::new(timestamp, None)));
        }

        let number = value
            .strip_suffix(MS_SUFFIX)
            .ok_or_else(|| ParseError::InvalidLatency(value.to_string()))?;
        let latency: f64 = number
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidLatency(value.to_string()))?;

        if !latency.is_finite() || latency < 0.0 {
            return Err(ParseError::InvalidLatency(value.to_string()));
        }

        Ok(LogRecord::Measurement(Measurement::new(timestamp, Some(latency))))
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self.timestamp().format(TIMESTAMP_FORMAT);
        match self {
            LogRecord::Measurement(m) => match m.latency {
                Some(ms) => write!(f, "[{}] {}{:.2}{}", stamp, LATENCY_PREFIX, ms, MS_SUFFIX),
                None => write!(f, "[{}] {}{}", stamp, LATENCY_PREFIX, NO_RESPONSE),
            },
            LogRecord::Event { message, .. } => write!(f, "[{}] {}{}", stamp, ERROR_PREFIX, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_latency_line() {
        let record: LogRecord = "[2024-05-01 12:00:00] Latency: 14.20 ms".parse().unwrap();
        assert_eq!(record, LogRecord::Measurement(Measurement::new(ts(), Some(14.2))));
    }

    #[test]
    fn parses_no_response_line() {
        let record: LogRecord = "[2024-05-01 12:00:00] Latency: NO RESPONSE".parse().unwrap();
        assert_eq!(record, LogRecord::Measurement(Measurement::new(ts(), None)));
    }

    #[test]
    fn parses_error_line_as_event() {
        let record: LogRecord = "[2024-05-01 12:00:00] ERROR: Network recovered".parse().unwrap();
        assert_eq!(
            record,
            LogRecord::Event {
                timestamp: ts(),
                message: "Network recovered".to_string()
            }
        );
        assert!(record.into_measurement().is_none());
    }

    #[test]
    fn error_line_mentioning_latency_is_still_an_event() {
        let line = "[2024-05-01 12:00:00] ERROR: Latency: 5.00 ms looked odd";
        assert!(LogRecord::parse_measurement(line).is_none());
    }

    #[test]
    fn tolerates_trailing_newline_and_whitespace() {
        let m = LogRecord::parse_measurement("  [2024-05-01 12:00:00] Latency: 1.00 ms\r\n");
        assert_eq!(m.unwrap().latency, Some(1.0));
    }

    #[test]
    fn rejects_missing_bracket() {
        let err = "2024-05-01 12:00:00 Latency: 1 ms".parse::<LogRecord>().unwrap_err();
        assert_eq!(err, ParseError::MissingTimestamp);
    }

    #[test]
    fn rejects_bad_timestamp() {
        let err = "[2024-13-01 12:00:00] Latency: 1.00 ms".parse::<LogRecord>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidTimestamp(_)));
    }

    #[test]
    fn rejects_unknown_body() {
        let err = "[2024-05-01 12:00:00] Jitter: 1.00 ms".parse::<LogRecord>().unwrap_err();
        assert!(matches!(err, ParseError::UnknownBody(_)));
    }

    #[test]
    fn rejects_non_numeric_negative_and_non_finite_latency() {
        for body in ["abc ms", "-3.00 ms", "NaN ms", "inf ms", "12.00"] {
            let line = format!("[2024-05-01 12:00:00] Latency: {}", body);
            let err = line.parse::<LogRecord>().unwrap_err();
            assert!(matches!(err, ParseError::InvalidLatency(_)), "{}", body);
        }
    }

    #[test]
    fn integer_latency_is_accepted() {
        let m = LogRecord::parse_measurement("[2024-05-01 12:00:00] Latency: 23 ms").unwrap();
        assert_eq!(m.latency, Some(23.0));
    }

    #[test]
    fn event_display() {
        let record = LogRecord::Event {
            timestamp: ts(),
            message: "Monitor stopped by user".to_string(),
        };
        assert_eq!(
            record.to_string(),
            "[2024-05-01 12:00:00] ERROR: Monitor stopped by user"
        );
    }

    #[test]
    fn written_lines_parse_back() {
        let original = Measurement::new(ts(), Some(0.05));
        let parsed = LogRecord::parse_measurement(&original.to_log_line()).unwrap();
        assert_eq!(parsed.timestamp, original.timestamp);
        assert_eq!(parsed.latency, Some(0.05));
    }
}
