//! Console rendering for the binary.

use pingwatch_monitor::{AlertState, HealthStatus, StatusUpdate, Summary};
use serde::Serialize;

/// One line per tick, e.g.
/// `[2024-05-01 12:00:00] Latency: 14.20 ms  OK`.
pub fn tick_line(update: &StatusUpdate) -> String {
    let mut line = format!(
        "{}  {}",
        update.measurement.to_log_line(),
        update.health.symbol()
    );
    if update.health == HealthStatus::Down {
        line.push_str(&format!(
            " ({} consecutive)",
            update.summary.consecutive_failures
        ));
    }
    if update.alert == AlertState::Fired {
        line.push_str("  [alerted]");
    }
    line
}

/// Startup banner.
pub fn banner(target: &str, interval_secs: u64, latency_ms: f64, failures: u64) -> String {
    format!(
        "pingwatch monitoring {} every {}s\n\
         Alert threshold: {} ms or {} consecutive failures\n\
         Press Ctrl+C to stop",
        target, interval_secs, latency_ms, failures
    )
}

/// JSON document printed by `--summary`.
#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub log_file: String,
    pub applied: usize,
    pub skipped: usize,
    pub summary: Summary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pingwatch_monitor::Measurement;

    fn update(latency: Option<f64>, health: HealthStatus, alert: AlertState) -> StatusUpdate {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        StatusUpdate {
            target: "8.8.8.8".into(),
            measurement: Measurement::new(ts, latency),
            summary: Summary {
                consecutive_failures: if latency.is_none() { 2 } else { 0 },
                ..Default::default()
            },
            health,
            alert,
        }
    }

    #[test]
    fn healthy_line() {
        let line = tick_line(&update(Some(14.2), HealthStatus::Healthy, AlertState::Armed));
        assert_eq!(line, "[2024-05-01 12:00:00] Latency: 14.20 ms  OK");
    }

    #[test]
    fn down_line_shows_run_and_alert() {
        let line = tick_line(&update(None, HealthStatus::Down, AlertState::Fired));
        assert_eq!(
            line,
            "[2024-05-01 12:00:00] Latency: NO RESPONSE  DOWN (2 consecutive)  [alerted]"
        );
    }

    #[test]
    fn summary_report_serializes() {
        let report = SummaryReport {
            log_file: "log.txt".into(),
            applied: 3,
            skipped: 1,
            summary: Summary {
                total_pings: 3,
                successful: 2,
                failed: 1,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["applied"], 3);
        assert_eq!(json["summary"]["total_pings"], 3);
        assert_eq!(json["summary"]["failed"], 1);
    }
}
