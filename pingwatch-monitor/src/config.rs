//! Monitor configuration.

use std::time::Duration;

use crate::MonitorError;

/// Shortest check interval accepted by [`MonitorConfig::validate`].
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Settings read once when a monitor is built.
///
/// A running monitor never observes changes to these values; apply new
/// settings through [`Monitor::reconfigure`](crate::Monitor::reconfigure),
/// which stops the loop, rebuilds the dependent pieces and starts again.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Host name or address to probe.
    pub target: String,
    /// Time between the end of one tick and the start of the next.
    pub check_interval: Duration,
    /// Latency above which a reachable probe counts as an issue.
    pub latency_threshold_ms: f64,
    /// Consecutive unreachable probes needed to raise an alert.
    pub failure_threshold: u64,
    /// Capacity of the rolling measurement window.
    pub max_history: usize,
    /// Who the notifier should address, if anyone.
    pub recipient: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target: "8.8.8.8".to_string(),
            check_interval: Duration::from_secs(30),
            latency_threshold_ms: 1000.0,
            failure_threshold: 3,
            max_history: 1000,
            recipient: None,
        }
    }
}

impl MonitorConfig {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.target.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("target must not be empty".into()));
        }
        if self.check_interval < MIN_CHECK_INTERVAL {
            return Err(MonitorError::InvalidConfig(format!(
                "check interval must be at least {}s, got {:?}",
                MIN_CHECK_INTERVAL.as_secs(),
                self.check_interval
            )));
        }
        if !self.latency_threshold_ms.is_finite() || self.latency_threshold_ms < 0.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "latency threshold must be a non-negative number, got {}",
                self.latency_threshold_ms
            )));
        }
        if self.failure_threshold == 0 {
            return Err(MonitorError::InvalidConfig(
                "failure threshold must be at least 1".into(),
            ));
        }
        if self.max_history == 0 {
            return Err(MonitorError::InvalidConfig(
                "max history must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.max_history, 1000);
    }

    #[test]
    fn rejects_blank_target() {
        let config = MonitorConfig {
            target: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_short_interval() {
        let config = MonitorConfig {
            check_interval: Duration::from_secs(4),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least 5s"));
    }

    #[test]
    fn accepts_minimum_interval() {
        let config = MonitorConfig {
            check_interval: MIN_CHECK_INTERVAL,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_thresholds_and_capacity() {
        let zero_failures = MonitorConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(zero_failures.validate().is_err());

        let zero_history = MonitorConfig {
            max_history: 0,
            ..Default::default()
        };
        assert!(zero_history.validate().is_err());

        let nan_latency = MonitorConfig {
            latency_threshold_ms: f64::NAN,
            ..Default::default()
        };
        assert!(nan_latency.validate().is_err());
    }
}
