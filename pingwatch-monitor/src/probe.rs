//! Reachability probes.
//!
//! A probe performs one round-trip check against its target and reports the
//! latency. Ordinary network trouble (timeouts, unreachable hosts, missing
//! `ping` binary, unparsable output) is never an error: it is a measurement
//! with no latency.

use std::fmt::Debug;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pingwatch_types::Measurement;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, warn};

/// Upper bound on a single probe, including process startup.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Seconds `ping` itself waits for the echo reply.
const PING_REPLY_WAIT_SECS: u64 = 5;

/// A single-target reachability check.
#[async_trait]
pub trait Probe: Send + Sync + Debug {
    /// Human-readable target, used in alerts and status lines.
    fn target(&self) -> &str;

    /// Perform one check. Must not panic or error on network failure.
    async fn measure(&self) -> Measurement;
}

/// Command-line dialect of the system `ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingFlavor {
    /// `-n 1 -w <ms>`
    Windows,
    /// iputils and busybox: `-c 1 -W <secs>`. Also used for other unixes.
    Linux,
    /// macOS and FreeBSD: `-c 1 -W <ms>`
    Bsd,
}

impl PingFlavor {
    /// The dialect of the platform this was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            PingFlavor::Windows
        } else if cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "dragonfly"
        )) {
            PingFlavor::Bsd
        } else {
            PingFlavor::Linux
        }
    }

    /// Arguments for a single echo to `target`.
    pub fn args(self, target: &str) -> Vec<String> {
        let (count, wait_flag, wait) = match self {
            PingFlavor::Windows => ("-n", "-w", PING_REPLY_WAIT_SECS * 1000),
            PingFlavor::Linux => ("-c", "-W", PING_REPLY_WAIT_SECS),
            PingFlavor::Bsd => ("-c", "-W", PING_REPLY_WAIT_SECS * 1000),
        };
        vec![
            count.to_string(),
            "1".to_string(),
            wait_flag.to_string(),
            wait.to_string(),
            target.to_string(),
        ]
    }
}

/// Probe backed by the operating system's `ping` command.
///
/// The child process is killed if the probe times out or the future is
/// dropped, so an aborted tick never leaves a stray `ping` behind.
#[derive(Debug, Clone)]
pub struct PingProbe {
    target: String,
    timeout: Duration,
    flavor: PingFlavor,
}

impl PingProbe {
    /// Create a probe for `target` with the default timeout.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            flavor: PingFlavor::host(),
        }
    }

    /// Override the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the argument dialect.
    pub fn with_flavor(mut self, flavor: PingFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("ping");
        cmd.args(self.flavor.args(&self.target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW: keep a console from flashing up per probe.
            cmd.creation_flags(0x0800_0000);
        }

        cmd
    }

    async fn round_trip(&self) -> Option<f64> {
        if self.target.starts_with('-') {
            warn!("refusing to ping target that looks like an option: {}", self.target);
            return None;
        }

        let output = match tokio::time::timeout(self.timeout, self.command().output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("failed to run ping for {}: {}", self.target, e);
                return None;
            }
            Err(_) => {
                debug!("ping to {} timed out after {:?}", self.target, self.timeout);
                return None;
            }
        };

        if !output.status.success() {
            debug!("ping to {} exited with {}", self.target, output.status);
            return None;
        }

        parse_ping_latency(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl Probe for PingProbe {
    fn target(&self) -> &str {
        &self.target
    }

    async fn measure(&self) -> Measurement {
        let latency = self.round_trip().await;
        Measurement::new(pingwatch_types::now(), latency)
    }
}

/// Probe that times a TCP connect to `host:port`.
///
/// Useful where ICMP is filtered or `ping` needs privileges. The measured
/// time includes name resolution.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    label: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let label = format!("{}:{}", host, port);
        Self {
            host,
            port,
            label,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connect_time(&self) -> Option<f64> {
        let started = Instant::now();
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => Some(started.elapsed().as_secs_f64() * 1000.0),
            Ok(Err(e)) => {
                debug!("connect to {} failed: {}", self.label, e);
                None
            }
            Err(_) => {
                debug!("connect to {} timed out after {:?}", self.label, self.timeout);
                None
            }
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn target(&self) -> &str {
        &self.label
    }

    async fn measure(&self) -> Measurement {
        let latency = self.connect_time().await;
        Measurement::new(pingwatch_types::now(), latency)
    }
}

/// Extract the round-trip time from `ping` output.
///
/// Understands `time=12.3 ms` (Linux, macOS), `time=12ms` and `time<1ms`
/// (Windows). The value is returned at the precision the platform printed;
/// `time<1ms` reads as `1.0`.
pub fn parse_ping_latency(output: &str) -> Option<f64> {
    let lower = output.to_ascii_lowercase();
    let mut rest = lower.as_str();

    while let Some(idx) = rest.find("time") {
        let after = &rest[idx + "time".len()..];
        if let Some(value) = after.strip_prefix('=').or_else(|| after.strip_prefix('<')) {
            let end = value
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(value.len());
            let (number, tail) = value.split_at(end);
            if !number.is_empty() && tail.trim_start().starts_with("ms") {
                if let Ok(ms) = number.parse::<f64>() {
                    if ms.is_finite() && ms >= 0.0 {
                        return Some(ms);
                    }
                }
            }
        }
        rest = after;
    }

    None
}
