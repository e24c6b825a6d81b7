//! Error types for the monitor.

use thiserror::Error;

/// Errors surfaced by monitor construction and log access.
///
/// None of these are raised from inside a running tick; the loop absorbs
/// probe, notifier and log failures itself.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Reading or writing the durable log failed.
    #[error("log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value is outside its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The operation needs the background loop to be stopped.
    #[error("monitor loop is running")]
    AlreadyRunning,
}

/// Errors that can occur when delivering an alert notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport could not reach the notification service.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The notification service answered but refused the message.
    #[error("notification rejected: {0}")]
    Rejected(String),

    /// No recipient or endpoint is configured.
    #[error("notifier not configured")]
    NotConfigured,
}
