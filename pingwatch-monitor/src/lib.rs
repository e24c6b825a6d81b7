//! # pingwatch-monitor
//!
//! Latency monitoring for a single network target.
//!
//! A [`Monitor`] probes its target on a fixed interval, keeps a rolling
//! window of measurements alongside lifetime counters, appends every result
//! to a durable log, and sends at most one alert per degradation episode.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pingwatch_monitor::{LogSink, Monitor, MonitorConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = MonitorConfig {
//!         target: "1.1.1.1".into(),
//!         check_interval: Duration::from_secs(10),
//!         ..Default::default()
//!     };
//!
//!     let mut monitor = Monitor::builder()
//!         .config(config)
//!         .sink(LogSink::file("network_monitor_log.txt"))
//!         .on_status(|update| println!("{}", update.status_line()))
//!         .build();
//!
//!     // Pick up where the last run left off.
//!     monitor.rehydrate_from_log().unwrap();
//!
//!     monitor.start();
//!     tokio::signal::ctrl_c().await.unwrap();
//!     monitor.stop().await;
//! }
//! ```
//!
//! ## Pieces
//!
//! - [`Probe`]: one round-trip check ([`PingProbe`], [`TcpProbe`])
//! - [`HistoryStore`] / [`SharedHistory`]: window, counters, rehydration
//! - [`AlertMachine`]: armed/fired state and notification side effects
//! - [`LogSink`]: the durable line log
//! - [`Notifier`]: pluggable alert transport

mod alert;
mod config;
mod error;
mod history;
mod monitor;
mod notifier;
mod probe;
mod sink;

pub use alert::{AlertMachine, AlertState, AlertThresholds, Transition, NOTIFY_TIMEOUT};
pub use config::{MonitorConfig, MIN_CHECK_INTERVAL};
pub use error::{MonitorError, NotifyError};
pub use history::{HistoryStore, RehydrateReport, SharedHistory, DEFAULT_MAX_HISTORY};
pub use monitor::{Monitor, MonitorBuilder, StatusCallback, StatusUpdate, STOP_TIMEOUT};
pub use notifier::{AlertMessage, Notifier, ALERT_SUBJECT};
pub use probe::{
    parse_ping_latency, PingFlavor, PingProbe, Probe, TcpProbe, DEFAULT_PROBE_TIMEOUT,
};
pub use sink::{LogSink, MemoryLog};

// Re-export types for convenience
pub use pingwatch_types::{
    HealthStatus, LogRecord, Measurement, ParseError, Summary, TIMESTAMP_FORMAT,
};
