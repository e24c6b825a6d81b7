//! History and durable log across monitor restarts.

use std::collections::VecDeque;
use std::fs;

use async_trait::async_trait;
use parking_lot::Mutex;
use pingwatch_monitor::{
    LogRecord, LogSink, Measurement, Monitor, MonitorConfig, Probe, SharedHistory, Summary,
};
use tempfile::TempDir;

#[derive(Debug)]
struct ScriptedProbe {
    script: Mutex<VecDeque<Option<f64>>>,
}

#[async_trait]
impl Probe for ScriptedProbe {
    fn target(&self) -> &str {
        "192.0.2.1"
    }

    async fn measure(&self) -> Measurement {
        let latency = self.script.lock().pop_front().flatten();
        Measurement::new(pingwatch_types::now(), latency)
    }
}

fn probe(script: impl IntoIterator<Item = Option<f64>>) -> ScriptedProbe {
    ScriptedProbe {
        script: Mutex::new(script.into_iter().collect()),
    }
}

#[tokio::test]
async fn restart_keeps_lifetime_counters() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("network_monitor_log.txt");

    let first = Monitor::builder()
        .probe(probe([Some(10.0), None, Some(30.0)]))
        .sink(LogSink::file(&log_path))
        .build();
    for _ in 0..3 {
        first.tick_once().await.unwrap();
    }
    let before = first.summary();
    drop(first);

    let second = Monitor::builder()
        .probe(probe([]))
        .sink(LogSink::file(&log_path))
        .build();
    let report = second.rehydrate_from_log().unwrap();

    assert_eq!(report.applied, 3);
    assert_eq!(second.summary().total_pings, before.total_pings);
    assert_eq!(second.summary().failed, 1);
    assert_eq!(second.summary().avg_latency, 20.0);
}

#[tokio::test]
async fn rehydrate_counts_only_valid_measurements() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("log.txt");
    fs::write(
        &log_path,
        "[2024-05-01 12:00:00] Latency: 12.00 ms\n\
         garbage that is not a record\n\
         [2024-05-01 12:00:30] ERROR: Network recovered\n\
         [2024-05-01 12:01:00] Latency: NO RESPONSE\n\
         [not a date] Latency: 5.00 ms\n\
         \n\
         [2024-05-01 12:01:30] Latency: 14.50 ms\n\
         [2024-05-01 12:02:00] Latency: fast\n",
    )
    .unwrap();

    let history = SharedHistory::new(100);
    let report = history.rehydrate_from_file(&log_path).unwrap();

    assert_eq!(report.applied, 3);
    assert_eq!(report.skipped, 4);

    let summary = history.summary();
    assert_eq!(summary.total_pings, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.consecutive_failures, 0);
    assert_eq!(summary.min_latency, 12.0);
    assert_eq!(summary.max_latency, 14.5);
}

#[tokio::test]
async fn missing_log_rehydrates_nothing() {
    let dir = TempDir::new().unwrap();
    let monitor = Monitor::builder()
        .probe(probe([]))
        .sink(LogSink::file(dir.path().join("absent.txt")))
        .build();

    let report = monitor.rehydrate_from_log().unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(monitor.summary(), Summary::default());
}

#[tokio::test]
async fn window_keeps_last_five_of_seven() {
    let config = MonitorConfig {
        max_history: 5,
        ..Default::default()
    };
    let monitor = Monitor::builder()
        .config(config)
        .probe(probe((1..=7).map(|i| Some(i as f64))))
        .build();
    for _ in 0..7 {
        monitor.tick_once().await.unwrap();
    }

    let latencies: Vec<_> = monitor.all().iter().filter_map(|m| m.latency).collect();
    assert_eq!(latencies, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    assert_eq!(monitor.summary().total_pings, 7);

    // Lifetime average covers evicted entries; min/max only the window.
    let summary = monitor.summary();
    assert_eq!(summary.avg_latency, 4.0);
    assert_eq!(summary.min_latency, 3.0);
    assert_eq!(summary.max_latency, 7.0);

    let tail: Vec<_> = monitor.last_n(2).iter().filter_map(|m| m.latency).collect();
    assert_eq!(tail, vec![6.0, 7.0]);
}

#[tokio::test]
async fn clear_starts_new_lifetime() {
    let monitor = Monitor::builder()
        .probe(probe([Some(5.0), None, None, Some(8.0)]))
        .build();
    for _ in 0..4 {
        monitor.tick_once().await.unwrap();
    }

    monitor.clear();
    assert_eq!(monitor.summary(), Summary::default());
    assert!(monitor.all().is_empty());
    assert_eq!(monitor.consecutive_failures(), 0);
}

#[tokio::test]
async fn every_tick_lands_in_the_log_file() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("log.txt");
    let monitor = Monitor::builder()
        .config(MonitorConfig {
            failure_threshold: 2,
            ..Default::default()
        })
        .probe(probe([Some(9.99), None, None]))
        .sink(LogSink::file(&log_path))
        .build();
    for _ in 0..3 {
        monitor.tick_once().await.unwrap();
    }

    let content = fs::read_to_string(&log_path).unwrap();
    let records: Vec<LogRecord> = content.lines().map(|l| l.parse().unwrap()).collect();

    let measurements: Vec<_> = records
        .iter()
        .filter_map(|r| r.clone().into_measurement())
        .map(|m| m.latency)
        .collect();
    assert_eq!(measurements, vec![Some(9.99), None, None]);

    let events: Vec<_> = records
        .iter()
        .filter_map(|r| match r {
            LogRecord::Event { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        events,
        vec![
            "Network issue detected - 2 consecutive failures",
            "Notifier not configured",
        ]
    );
}
