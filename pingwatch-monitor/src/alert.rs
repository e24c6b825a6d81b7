//! One-shot alerting.
//!
//! The machine is either `Armed` (no alert sent for the current episode) or
//! `Fired`. An issue while armed sends exactly one notification; a healthy
//! measurement while fired re-arms it. Repeated issues while fired are quiet.
//!
//! "Issue" combines two independent signals: the store's consecutive
//! unreachable count reaching the failure threshold, or a reachable probe
//! slower than the latency threshold. A slow probe does not touch the
//! consecutive count, but it is still an issue here.

use std::sync::Arc;
use std::time::Duration;

use pingwatch_types::Measurement;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::notifier::{AlertMessage, Notifier};
use crate::sink::LogSink;

/// Upper bound on one notification attempt. Shorter than
/// [`STOP_TIMEOUT`](crate::STOP_TIMEOUT), so a stop waits for the outcome.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(4);

/// Whether an alert has gone out for the current episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    #[default]
    Armed,
    Fired,
}

/// What happened on a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No state change.
    Unchanged,
    /// Armed -> Fired; a notification was attempted.
    Fired,
    /// Fired -> Armed.
    Recovered,
}

/// Limits that define an issue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub failure_threshold: u64,
    pub latency_threshold_ms: f64,
}

impl AlertThresholds {
    pub fn is_issue(&self, measurement: &Measurement, consecutive_failures: u64) -> bool {
        consecutive_failures >= self.failure_threshold
            || measurement
                .latency
                .is_some_and(|ms| ms > self.latency_threshold_ms)
    }

    pub fn is_recovery(&self, measurement: &Measurement) -> bool {
        measurement
            .latency
            .is_some_and(|ms| ms <= self.latency_threshold_ms)
    }
}

impl AlertState {
    /// Pure transition function.
    pub fn next(
        self,
        measurement: &Measurement,
        consecutive_failures: u64,
        thresholds: &AlertThresholds,
    ) -> (AlertState, Transition) {
        match self {
            AlertState::Armed if thresholds.is_issue(measurement, consecutive_failures) => {
                (AlertState::Fired, Transition::Fired)
            }
            AlertState::Fired if thresholds.is_recovery(measurement) => {
                (AlertState::Armed, Transition::Recovered)
            }
            state => (state, Transition::Unchanged),
        }
    }
}

/// Alert state plus the side effects of its transitions.
#[derive(Debug)]
pub struct AlertMachine {
    state: AlertState,
    thresholds: AlertThresholds,
    target: String,
    recipient: Option<String>,
    notifier: Option<Arc<dyn Notifier>>,
    sink: LogSink,
    published: watch::Sender<AlertState>,
}

impl AlertMachine {
    pub fn new(target: impl Into<String>, thresholds: AlertThresholds, sink: LogSink) -> Self {
        Self {
            state: AlertState::Armed,
            thresholds,
            target: target.into(),
            recipient: None,
            notifier: None,
            sink,
            published: watch::channel(AlertState::Armed).0,
        }
    }

    /// Attach a notifier and the recipient it should address.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, recipient: Option<String>) -> Self {
        self.notifier = Some(notifier);
        self.recipient = recipient;
        self
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Follow the state without locking the machine. A transition is
    /// published before its notification is sent.
    pub fn subscribe(&self) -> watch::Receiver<AlertState> {
        self.published.subscribe()
    }

    /// Feed the latest measurement and the store's consecutive-failure count.
    pub async fn evaluate(&mut self, measurement: &Measurement, consecutive_failures: u64) -> Transition {
        let (next, transition) = self
            .state
            .next(measurement, consecutive_failures, &self.thresholds);
        if next != self.state {
            self.state = next;
            self.published.send_replace(next);
        }

        match transition {
            Transition::Fired => self.fire(measurement, consecutive_failures).await,
            Transition::Recovered => {
                info!("network to {} recovered", self.target);
                self.sink.append_event("Network recovered").await;
            }
            Transition::Unchanged => {}
        }

        transition
    }

    async fn fire(&self, measurement: &Measurement, consecutive_failures: u64) {
        warn!(
            "network issue on {}: latency {:?}, {} consecutive failures",
            self.target, measurement.latency, consecutive_failures
        );
        self.sink
            .append_event(format!(
                "Network issue detected - {} consecutive failures",
                consecutive_failures
            ))
            .await;

        let Some(notifier) = &self.notifier else {
            self.sink.append_event("Notifier not configured").await;
            return;
        };
        let Some(recipient) = self.recipient.as_deref() else {
            warn!("no alert recipient configured, notification skipped");
            self.sink.append_event("Alert recipient not configured").await;
            return;
        };

        let message = AlertMessage::compose(
            &self.target,
            measurement,
            consecutive_failures,
            self.thresholds.latency_threshold_ms,
        );
        let send = notifier.notify(recipient, &message.subject, &message.body);

        match tokio::time::timeout(NOTIFY_TIMEOUT, send).await {
            Ok(Ok(())) => {
                info!("alert notification sent for {}", self.target);
                self.sink.append_event("Alert notification sent successfully").await;
            }
            Ok(Err(e)) => {
                error!("failed to send alert notification: {}", e);
                self.sink.append_event("Failed to send alert notification").await;
            }
            Err(_) => {
                error!("alert notification timed out after {:?}", NOTIFY_TIMEOUT);
                self.sink.append_event("Failed to send alert notification").await;
            }
        }
    }
}
