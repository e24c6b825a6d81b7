//! Per-measurement health classification for presentation layers.

use crate::Measurement;

/// Health of the monitored link as of the latest measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HealthStatus {
    /// No measurement taken yet.
    #[default]
    Unknown,
    Healthy,
    /// Reachable, but slower than the latency threshold.
    Degraded,
    /// No response.
    Down,
}

impl HealthStatus {
    /// Classify a measurement against a latency threshold in milliseconds.
    pub fn classify(measurement: &Measurement, latency_threshold_ms: f64) -> Self {
        match measurement.latency {
            None => HealthStatus::Down,
            Some(ms) if ms > latency_threshold_ms => HealthStatus::Degraded,
            Some(_) => HealthStatus::Healthy,
        }
    }

    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "--",
            HealthStatus::Healthy => "OK",
            HealthStatus::Degraded => "SLOW",
            HealthStatus::Down => "DOWN",
        }
    }
}
