//! Durable log sink.
//!
//! Appends one [`LogRecord`] per line. Write failures are reported through
//! `tracing` and otherwise swallowed so that the monitor loop keeps going.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use pingwatch_types::{LogRecord, Measurement};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Destination for log records.
#[derive(Debug, Clone)]
pub enum LogSink {
    /// Append to a UTF-8 text file, creating it on first write.
    File(PathBuf),

    /// Keep lines in memory. Use [`LogSink::memory`] to get the reader half.
    Memory(Arc<Mutex<Vec<String>>>),

    /// Drop every record.
    Discard,
}

impl LogSink {
    /// Create a file sink.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pingwatch_monitor::LogSink;
    ///
    /// let sink = LogSink::file("log.txt");
    /// assert_eq!(sink.path().unwrap().to_str(), Some("log.txt"));
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        LogSink::File(path.into())
    }

    /// Create an in-memory sink and the handle for reading it back.
    pub fn memory() -> (Self, MemoryLog) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (LogSink::Memory(lines.clone()), MemoryLog { lines })
    }

    /// Path of a file sink.
    pub fn path(&self) -> Option<&Path> {
        match self {
            LogSink::File(path) => Some(path),
            _ => None,
        }
    }

    /// Create the log file if it does not exist yet.
    pub async fn touch(&self) -> std::io::Result<()> {
        if let LogSink::File(path) = self {
            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
        }
        Ok(())
    }

    /// Append a record, reporting failures to the diagnostic log only.
    pub async fn append(&self, record: &LogRecord) {
        if let Err(e) = self.try_append(record).await {
            warn!("error writing to log file: {}", e);
        }
    }

    pub async fn append_measurement(&self, measurement: &Measurement) {
        self.append(&LogRecord::Measurement(*measurement)).await;
    }

    /// Append an `ERROR:` event line stamped now.
    pub async fn append_event(&self, message: impl Into<String>) {
        self.append(&LogRecord::event(message)).await;
    }

    /// Append a record, surfacing I/O errors.
    pub async fn try_append(&self, record: &LogRecord) -> std::io::Result<()> {
        match self {
            LogSink::File(path) => {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                let line = format!("{}\n", record);
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
            }
            LogSink::Memory(lines) => lines.lock().push(record.to_string()),
            LogSink::Discard => {}
        }
        Ok(())
    }
}

/// Reader half of an in-memory sink.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    /// Every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Messages of the `ERROR:` event lines, in order.
    pub fn events(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter_map(|line| match line.parse::<LogRecord>() {
                Ok(LogRecord::Event { message, .. }) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Measurements written so far, in order.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.lines
            .lock()
            .iter()
            .filter_map(|line| LogRecord::parse_measurement(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_sink_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        let sink = LogSink::file(&path);

        sink.append_measurement(&Measurement::reachable(12.5)).await;
        sink.append_measurement(&Measurement::unreachable()).await;
        sink.append_event("Network recovered").await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("] Latency: 12.50 ms"));
        assert!(lines[1].ends_with("] Latency: NO RESPONSE"));
        assert!(lines[2].ends_with("] ERROR: Network recovered"));
    }

    #[tokio::test]
    async fn file_sink_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "[2024-05-01 12:00:00] Latency: 1.00 ms\n").unwrap();

        LogSink::file(&path).append_event("Monitor started").await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("[2024-05-01 12:00:00] Latency: 1.00 ms\n"));
    }

    #[tokio::test]
    async fn touch_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.txt");
        LogSink::file(&path).touch().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn unwritable_path_is_not_fatal() {
        let sink = LogSink::file("/nonexistent/dir/log.txt");
        assert!(sink.try_append(&LogRecord::event("x")).await.is_err());
        // The lenient path only warns.
        sink.append_event("x").await;
    }

    #[tokio::test]
    async fn memory_sink_splits_events_and_measurements() {
        let (sink, log) = LogSink::memory();
        sink.append_measurement(&Measurement::reachable(3.0)).await;
        sink.append_event("Network issue detected - 3 consecutive failures").await;

        assert_eq!(log.lines().len(), 2);
        assert_eq!(log.measurements().len(), 1);
        assert_eq!(
            log.events(),
            vec!["Network issue detected - 3 consecutive failures".to_string()]
        );
    }

    #[tokio::test]
    async fn discard_sink_accepts_everything() {
        let sink = LogSink::Discard;
        assert!(sink.try_append(&LogRecord::event("ignored")).await.is_ok());
        assert!(sink.path().is_none());
    }
}
