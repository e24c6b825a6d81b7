//! Layered settings: optional file, then `PINGWATCH_*` environment, then flags.
//!
//! ```toml
//! [monitoring]
//! target_host = "8.8.8.8"
//! check_interval_seconds = 30
//! latency_threshold_ms = 1000.0
//! failure_threshold = 3
//! max_history = 1000
//! log_file = "log.txt"
//! probe = "icmp"
//! tcp_port = 443
//!
//! [notify]
//! webhook_url = "https://hooks.example/alert"
//! recipient = "ops@example.com"
//! timeout_seconds = 4
//! ```
//!
//! Environment keys nest with `__`, e.g.
//! `PINGWATCH_MONITORING__TARGET_HOST=1.1.1.1`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use pingwatch_monitor::{MonitorConfig, PingProbe, Probe, TcpProbe, DEFAULT_MAX_HISTORY};
use serde::Deserialize;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_NAME: &str = "pingwatch";

const ENV_PREFIX: &str = "PINGWATCH";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitoring: MonitoringSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub target_host: String,
    pub check_interval_seconds: u64,
    pub latency_threshold_ms: f64,
    pub failure_threshold: u64,
    pub max_history: usize,
    pub log_file: PathBuf,
    pub probe: ProbeKind,
    /// Port for the `tcp` probe.
    pub tcp_port: u16,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            target_host: "8.8.8.8".to_string(),
            check_interval_seconds: 30,
            latency_threshold_ms: 1000.0,
            failure_threshold: 3,
            max_history: DEFAULT_MAX_HISTORY,
            log_file: PathBuf::from("log.txt"),
            probe: ProbeKind::Icmp,
            tcp_port: 443,
        }
    }
}

/// Which probe implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// The system `ping` command.
    #[default]
    Icmp,
    /// Timed TCP connect.
    Tcp,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// Alerts are only sent when this is set.
    pub webhook_url: Option<String>,
    pub recipient: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            recipient: None,
            timeout_seconds: 4,
        }
    }
}

/// Values given on the command line. `None` leaves the layered value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<String>,
    pub interval_seconds: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Load from `path` (required) or `./pingwatch.{toml,json,yaml}`
    /// (optional), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(path, Self::environment())
    }

    /// Load with an explicit environment source.
    pub fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    /// The `PINGWATCH_` environment source.
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(target) = &overrides.target {
            self.monitoring.target_host = target.clone();
        }
        if let Some(secs) = overrides.interval_seconds {
            self.monitoring.check_interval_seconds = secs;
        }
        if let Some(path) = &overrides.log_file {
            self.monitoring.log_file = path.clone();
        }
    }

    /// The monitor's view of these settings. Not validated.
    pub fn monitor_config(&self) -> MonitorConfig {
        let m = &self.monitoring;
        MonitorConfig {
            target: m.target_host.clone(),
            check_interval: Duration::from_secs(m.check_interval_seconds),
            latency_threshold_ms: m.latency_threshold_ms,
            failure_threshold: m.failure_threshold,
            max_history: m.max_history,
            recipient: self.notify.recipient.clone(),
        }
    }

    pub fn probe(&self) -> Arc<dyn Probe> {
        let m = &self.monitoring;
        match m.probe {
            ProbeKind::Icmp => Arc::new(PingProbe::new(m.target_host.clone())),
            ProbeKind::Tcp => Arc::new(TcpProbe::new(m.target_host.clone(), m.tcp_port)),
        }
    }
}
