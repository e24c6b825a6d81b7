//! Rolling measurement history with lifetime counters.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use pingwatch_types::{LogRecord, Measurement, Summary};

use crate::MonitorError;

/// Default capacity of the measurement window.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Bounded window of recent measurements plus counters over the whole
/// lifetime of the store.
///
/// The window evicts its oldest entry once it reaches capacity, but the
/// lifetime counters keep counting. Only [`clear`](Self::clear) starts a new
/// lifetime.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    window: VecDeque<Measurement>,
    capacity: usize,
    total_count: u64,
    failed_count: u64,
    latency_sum: f64,
    consecutive_failures: u64,
}

/// Outcome of replaying log lines into a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrateReport {
    /// Measurement lines applied to the store.
    pub applied: usize,
    /// Non-blank lines that were not measurements (events or malformed text).
    pub skipped: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryStore {
    /// Create an empty store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_HISTORY)),
            capacity,
            total_count: 0,
            failed_count: 0,
            latency_sum: 0.0,
            consecutive_failures: 0,
        }
    }

    /// Record a new measurement.
    ///
    /// A latency that is negative or not finite is stored as unreachable,
    /// the same way the log codec reads it back.
    pub fn record(&mut self, mut measurement: Measurement) {
        if measurement
            .latency
            .is_some_and(|ms| !ms.is_finite() || ms < 0.0)
        {
            measurement.latency = None;
        }

        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(measurement);

        self.total_count += 1;
        match measurement.latency {
            None => {
                self.failed_count += 1;
                self.consecutive_failures += 1;
            }
            Some(ms) => {
                self.consecutive_failures = 0;
                self.latency_sum += ms;
            }
        }
    }

    /// The most recent `n` measurements, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Measurement> {
        let skip = self.window.len().saturating_sub(n);
        self.window.iter().skip(skip).copied().collect()
    }

    /// Every measurement in the window, oldest first.
    pub fn all(&self) -> Vec<Measurement> {
        self.window.iter().copied().collect()
    }

    /// Derived statistics.
    ///
    /// Totals and the average are lifetime values; min and max only look at
    /// the current window.
    pub fn summary(&self) -> Summary {
        let successful = self.total_count - self.failed_count;

        let avg_latency = if successful > 0 {
            self.latency_sum / successful as f64
        } else {
            0.0
        };
        let success_rate = if self.total_count > 0 {
            successful as f64 / self.total_count as f64 * 100.0
        } else {
            0.0
        };

        let (min_latency, max_latency) = self
            .window
            .iter()
            .filter_map(|m| m.latency)
            .fold(None, |acc: Option<(f64, f64)>, ms| match acc {
                None => Some((ms, ms)),
                Some((lo, hi)) => Some((lo.min(ms), hi.max(ms))),
            })
            .unwrap_or((0.0, 0.0));

        Summary {
            total_pings: self.total_count,
            successful,
            failed: self.failed_count,
            success_rate,
            avg_latency,
            min_latency,
            max_latency,
            consecutive_failures: self.consecutive_failures,
        }
    }

    /// Unreachable probes since the last success.
    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures
    }

    /// Replay durable log lines in order.
    ///
    /// Measurement lines go through the same path as [`record`](Self::record);
    /// event lines and anything malformed are skipped.
    pub fn rehydrate<I, S>(&mut self, lines: I) -> RehydrateReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = RehydrateReport::default();
        for line in lines {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            match LogRecord::parse_measurement(line) {
                Some(measurement) => {
                    self.record(measurement);
                    report.applied += 1;
                }
                None => report.skipped += 1,
            }
        }
        report
    }

    /// Replay the log file at `path`. A missing file applies nothing.
    ///
    /// Invalid UTF-8 is replaced rather than rejected so that one damaged
    /// line cannot hide the rest of the file.
    pub fn rehydrate_from_file(&mut self, path: &Path) -> Result<RehydrateReport, MonitorError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RehydrateReport::default()),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.rehydrate(text.lines()))
    }

    /// Drop every measurement and zero all counters.
    pub fn clear(&mut self) {
        self.window.clear();
        self.total_count = 0;
        self.failed_count = 0;
        self.latency_sum = 0.0;
        self.consecutive_failures = 0;
    }

    /// Number of measurements in the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the window capacity, evicting the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }
}

/// Thread-safe handle to a [`HistoryStore`].
///
/// Each method takes the lock once, so readers never see a half-applied
/// `record`.
#[derive(Debug, Clone, Default)]
pub struct SharedHistory {
    inner: Arc<RwLock<HistoryStore>>,
}

impl SharedHistory {
    /// Create a shared store with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self::from_store(HistoryStore::new(capacity))
    }

    /// Wrap an existing store, e.g. one rehydrated before the monitor starts.
    pub fn from_store(store: HistoryStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Record a measurement and return the summary as of that record.
    pub fn record(&self, measurement: Measurement) -> Summary {
        let mut store = self.inner.write();
        store.record(measurement);
        store.summary()
    }

    pub fn last_n(&self, n: usize) -> Vec<Measurement> {
        self.inner.read().last_n(n)
    }

    pub fn all(&self) -> Vec<Measurement> {
        self.inner.read().all()
    }

    pub fn summary(&self) -> Summary {
        self.inner.read().summary()
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.inner.read().consecutive_failures()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.inner.write().set_capacity(capacity);
    }

    /// Replay log lines under a single write lock.
    pub fn rehydrate<I, S>(&self, lines: I) -> RehydrateReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.write().rehydrate(lines)
    }

    /// Replay the log file at `path`.
    pub fn rehydrate_from_file(&self, path: &Path) -> Result<RehydrateReport, MonitorError> {
        self.inner.write().rehydrate_from_file(path)
    }

    /// Clone of the whole store at this instant.
    pub fn snapshot(&self) -> HistoryStore {
        self.inner.read().clone()
    }
}
