//! The monitor loop: probe, record, log, alert, report, sleep.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use pingwatch_types::{HealthStatus, Measurement, Summary};
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::alert::{AlertMachine, AlertState, AlertThresholds};
use crate::config::MonitorConfig;
use crate::history::{RehydrateReport, SharedHistory};
use crate::notifier::Notifier;
use crate::probe::{PingProbe, Probe};
use crate::sink::LogSink;
use crate::MonitorError;

/// How long [`Monitor::stop`] waits for the loop before aborting it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Callback invoked once per tick with the latest state.
///
/// Runs on the monitor task, so it should be cheap and never block.
pub type StatusCallback = Arc<dyn Fn(&StatusUpdate) + Send + Sync>;

/// Everything a presentation layer needs after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub target: String,
    pub measurement: Measurement,
    pub summary: Summary,
    pub health: HealthStatus,
    pub alert: AlertState,
}

impl StatusUpdate {
    /// Multi-line status suitable for a tooltip or console line.
    ///
    /// ```text
    /// Network Monitor
    /// [12:00:30] 14.20 ms
    /// Success Rate: 99.5%
    /// Avg: 15.1 ms
    /// ```
    pub fn status_line(&self) -> String {
        format!(
            "Network Monitor\n{}\nSuccess Rate: {:.1}%\nAvg: {:.1} ms",
            self.measurement, self.summary.success_rate, self.summary.avg_latency
        )
    }
}

/// Periodically probes one target and alerts on sustained degradation.
///
/// The monitor owns a single background task while running. That task is
/// the only writer of the history and alert state; everything else reads
/// through [`SharedHistory`] or issues control calls.
///
/// # Example
///
/// ```rust,no_run
/// use pingwatch_monitor::{LogSink, Monitor, MonitorConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let mut monitor = Monitor::builder()
///         .config(MonitorConfig::default())
///         .sink(LogSink::file("log.txt"))
///         .on_status(|update| println!("{}", update.measurement))
///         .build();
///
///     monitor.start();
///     tokio::time::sleep(std::time::Duration::from_secs(120)).await;
///     monitor.stop().await;
///
///     println!("{}", monitor.summary());
/// }
/// ```
pub struct Monitor {
    config: MonitorConfig,
    probe: Arc<dyn Probe>,
    history: SharedHistory,
    sink: LogSink,
    notifier: Option<Arc<dyn Notifier>>,
    alert: Arc<Mutex<AlertMachine>>,
    alert_state: watch::Receiver<AlertState>,
    status: Option<StatusCallback>,
    running: Option<RunningLoop>,
}

struct RunningLoop {
    control: watch::Sender<Control>,
    handle: JoinHandle<()>,
}

/// What the loop has been asked to do. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    /// Exit at the next tick boundary.
    Stop,
    /// Also give up a probe still in flight.
    Abandon,
}

impl Monitor {
    /// Create a builder for configuring the monitor.
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Start the background loop. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("monitor already running");
            return;
        }

        let (control, control_rx) = watch::channel(Control::Run);
        let ticker = self.ticker();
        let interval = self.config.check_interval;

        info!(
            "monitoring {} every {:?} (alert at {} ms or {} consecutive failures)",
            self.probe.target(),
            interval,
            self.config.latency_threshold_ms,
            self.config.failure_threshold
        );

        let handle = tokio::spawn(run_loop(ticker, interval, control_rx));
        self.running = Some(RunningLoop { control, handle });
    }

    /// Ask the loop to stop and wait up to [`STOP_TIMEOUT`] for it.
    ///
    /// The request is seen at the next tick boundary; the tick in progress
    /// finishes first. If the wait elapses while the probe is still running,
    /// the probe is given up and nothing is recorded for it. A tick that
    /// already has its measurement is never cut short: its alert send is
    /// bounded by [`NOTIFY_TIMEOUT`](crate::NOTIFY_TIMEOUT). Only if the loop
    /// is still busy after a second wait is the task aborted, and this
    /// returns once the abort has landed. Does nothing if the loop is not
    /// running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.control.send(Control::Stop);
        let mut handle = running.handle;

        if let Ok(result) = tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            log_exit(result);
            return;
        }

        warn!(
            "monitor loop did not stop within {:?}, abandoning probe in flight",
            STOP_TIMEOUT
        );
        let _ = running.control.send(Control::Abandon);

        match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            Ok(result) => log_exit(result),
            Err(_) => {
                warn!("monitor loop still busy, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
    }

    /// Whether the background loop is alive.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Run exactly one tick on the caller's task.
    ///
    /// Refused while the loop is running so there is never a second writer.
    pub async fn tick_once(&self) -> Result<StatusUpdate, MonitorError> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        Ok(self.ticker().tick().await)
    }

    /// Apply new settings: stop, rebuild the probe and alert state, start.
    ///
    /// History and lifetime counters are kept; the window is resized to the
    /// new capacity. The alert state starts over as armed. The loop is only
    /// restarted if it was running before.
    pub async fn reconfigure(
        &mut self,
        config: MonitorConfig,
        probe: Arc<dyn Probe>,
    ) -> Result<(), MonitorError> {
        config.validate()?;

        let was_running = self.is_running();
        self.stop().await;

        self.history.set_capacity(config.max_history);
        let alert = build_alert(&config, probe.as_ref(), &self.sink, self.notifier.clone());
        self.alert_state = alert.subscribe();
        self.alert = Arc::new(Mutex::new(alert));
        self.probe = probe;
        self.config = config;

        info!("monitor reconfigured for {}", self.probe.target());
        if was_running {
            self.start();
        }
        Ok(())
    }

    /// Replay the file sink's existing log into history.
    ///
    /// Intended for startup, before [`start`](Self::start). Sinks without a
    /// file apply nothing.
    pub fn rehydrate_from_log(&self) -> Result<RehydrateReport, MonitorError> {
        let Some(path) = self.sink.path() else {
            return Ok(RehydrateReport::default());
        };
        let report = self.history.rehydrate_from_file(path)?;
        info!(
            "restored stats: {} total pings, {} entries loaded from {}",
            self.history.summary().total_pings,
            self.history.len(),
            path.display()
        );
        Ok(report)
    }

    /// Shared handle to the history, for readers on other tasks or threads.
    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub fn last_n(&self, n: usize) -> Vec<Measurement> {
        self.history.last_n(n)
    }

    pub fn all(&self) -> Vec<Measurement> {
        self.history.all()
    }

    pub fn summary(&self) -> Summary {
        self.history.summary()
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.history.consecutive_failures()
    }

    /// Wipe history and counters.
    pub fn clear(&self) {
        self.history.clear();
    }

    /// Current alert state. Never waits on a tick in progress.
    pub fn alert_state(&self) -> AlertState {
        *self.alert_state.borrow()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn target(&self) -> &str {
        self.probe.target()
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    fn ticker(&self) -> Ticker {
        Ticker {
            probe: self.probe.clone(),
            history: self.history.clone(),
            sink: self.sink.clone(),
            alert: self.alert.clone(),
            status: self.status.clone(),
            latency_threshold_ms: self.config.latency_threshold_ms,
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("target", &self.probe.target())
            .field("config", &self.config)
            .field("sink", &self.sink)
            .field("running", &self.is_running())
            .finish()
    }
}

/// The pieces one tick touches, cloned into the loop task.
#[derive(Clone)]
struct Ticker {
    probe: Arc<dyn Probe>,
    history: SharedHistory,
    sink: LogSink,
    alert: Arc<Mutex<AlertMachine>>,
    status: Option<StatusCallback>,
    latency_threshold_ms: f64,
}

impl Ticker {
    async fn tick(&self) -> StatusUpdate {
        let measurement = self.probe.measure().await;
        self.process(measurement).await
    }

    /// Everything after the probe: record, log, alert, report.
    async fn process(&self, measurement: Measurement) -> StatusUpdate {
        let summary = self.history.record(measurement);
        self.sink.append_measurement(&measurement).await;

        let alert = {
            let mut machine = self.alert.lock().await;
            machine
                .evaluate(&measurement, summary.consecutive_failures)
                .await;
            machine.state()
        };

        let update = StatusUpdate {
            target: self.probe.target().to_string(),
            measurement,
            summary,
            health: HealthStatus::classify(&measurement, self.latency_threshold_ms),
            alert,
        };

        if let Some(callback) = &self.status {
            callback(&update);
        }

        update
    }
}

async fn run_loop(ticker: Ticker, interval: Duration, mut control: watch::Receiver<Control>) {
    loop {
        if *control.borrow() != Control::Run {
            break;
        }

        // Only an abandon can interrupt the probe. Once taken, a measurement
        // goes through the rest of the tick.
        let probed = tokio::select! {
            probed = AssertUnwindSafe(ticker.probe.measure()).catch_unwind() => probed,
            _ = control.wait_for(|c| *c == Control::Abandon) => break,
        };
        let outcome = match probed {
            Ok(measurement) => AssertUnwindSafe(ticker.process(measurement)).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        match outcome {
            Ok(update) => debug!("tick: {}", update.measurement),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("monitor loop error: {}", message);
                ticker
                    .sink
                    .append_event(format!("Monitor loop error: {}", message))
                    .await;
            }
        }

        // The probe race may already have seen a stop.
        if *control.borrow() != Control::Run {
            break;
        }
        // Any change is a stop; an error means the monitor itself is gone.
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = control.changed() => break,
        }
    }
    debug!("monitor loop exited");
}

fn log_exit(result: Result<(), JoinError>) {
    match result {
        Ok(()) => debug!("monitor loop stopped"),
        Err(e) => warn!("monitor loop ended abnormally: {}", e),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn build_alert(
    config: &MonitorConfig,
    probe: &dyn Probe,
    sink: &LogSink,
    notifier: Option<Arc<dyn Notifier>>,
) -> AlertMachine {
    let thresholds = AlertThresholds {
        failure_threshold: config.failure_threshold,
        latency_threshold_ms: config.latency_threshold_ms,
    };
    let machine = AlertMachine::new(probe.target(), thresholds, sink.clone());
    match notifier {
        Some(notifier) => machine.with_notifier(notifier, config.recipient.clone()),
        None => machine,
    }
}

/// Builder for configuring a [`Monitor`].
#[derive(Default)]
pub struct MonitorBuilder {
    config: MonitorConfig,
    probe: Option<Arc<dyn Probe>>,
    history: Option<SharedHistory>,
    sink: Option<LogSink>,
    notifier: Option<Arc<dyn Notifier>>,
    status: Option<StatusCallback>,
}

impl MonitorBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration. Not validated here; see
    /// [`MonitorConfig::validate`].
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific probe. Defaults to [`PingProbe`] on the configured target.
    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    pub fn probe_arc(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Share an existing history, e.g. one rehydrated ahead of time.
    pub fn history(mut self, history: SharedHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Where log records go. Defaults to [`LogSink::Discard`].
    pub fn sink(mut self, sink: LogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Register the per-tick status callback.
    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(&StatusUpdate) + Send + Sync + 'static,
    {
        self.status = Some(Arc::new(callback));
        self
    }

    /// Build the monitor. It is not started.
    pub fn build(self) -> Monitor {
        let config = self.config;
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(PingProbe::new(config.target.clone())));
        let history = match self.history {
            Some(history) => {
                history.set_capacity(config.max_history);
                history
            }
            None => SharedHistory::new(config.max_history),
        };
        let sink = self.sink.unwrap_or(LogSink::Discard);
        let alert = build_alert(&config, probe.as_ref(), &sink, self.notifier.clone());
        let alert_state = alert.subscribe();

        Monitor {
            config,
            probe,
            history,
            sink,
            notifier: self.notifier,
            alert: Arc::new(Mutex::new(alert)),
            alert_state,
            status: self.status,
            running: None,
        }
    }
}
