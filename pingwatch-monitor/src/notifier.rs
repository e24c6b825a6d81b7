//! Notification capability used when an alert fires.

use std::fmt::Debug;

use async_trait::async_trait;
use pingwatch_types::{Measurement, TIMESTAMP_FORMAT};

use crate::NotifyError;

/// Subject line of every alert.
pub const ALERT_SUBJECT: &str = "Internet is down";

/// Transport for alert notifications (email, chat webhook, pager, ...).
///
/// The monitor calls this at most once per degradation episode and never
/// retries. Any error counts as a failed delivery; the episode still counts
/// as alerted.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Subject and body of an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    /// Compose the alert for `measurement`, the one that opened the episode.
    pub fn compose(
        target: &str,
        measurement: &Measurement,
        consecutive_failures: u64,
        latency_threshold_ms: f64,
    ) -> Self {
        let time = measurement.timestamp.format(TIMESTAMP_FORMAT);
        let body = match measurement.latency {
            None => format!(
                "Network alert: No response from {}\n\
                 Consecutive failures: {}\n\
                 Time: {}",
                target, consecutive_failures, time
            ),
            Some(ms) => format!(
                "Network alert: High latency to {}\n\
                 Current latency: {:.2} ms\n\
                 Threshold: {} ms\n\
                 Consecutive failures: {}\n\
                 Time: {}",
                target, ms, latency_threshold_ms, consecutive_failures, time
            ),
        };
        Self {
            subject: ALERT_SUBJECT.to_string(),
            body,
        }
    }
}
