//! # pingwatch-types
//!
//! Core types shared by the pingwatch monitor and anything that renders its
//! output. This crate defines the measurement model, the derived summary
//! statistics, and the line-oriented record format used by the durable log.
//!
//! ## Features
//!
//! - `serde`: Serialize/deserialize measurements and summaries
//!
//! ## Example
//!
//! ```rust
//! use pingwatch_types::{LogRecord, Measurement};
//!
//! let line = "[2024-05-01 12:00:00] Latency: 14.20 ms";
//! let record: LogRecord = line.parse().unwrap();
//!
//! let measurement = record.into_measurement().unwrap();
//! assert_eq!(measurement.latency, Some(14.2));
//! assert_eq!(measurement.to_log_line(), line);
//! ```

mod health;
mod measurement;
mod record;
mod summary;

pub use health::*;
pub use measurement::*;
pub use record::*;
pub use summary::*;

/// Timestamp layout used inside `[...]` on every log line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
