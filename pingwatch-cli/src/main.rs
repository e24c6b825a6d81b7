use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pingwatch_cli::console::{self, SummaryReport};
use pingwatch_cli::{InstanceLock, Overrides, Settings, WebhookNotifier};
use pingwatch_monitor::{LogSink, Monitor, Notifier, SharedHistory};

#[derive(Parser, Debug)]
#[command(name = "pingwatch", version)]
#[command(about = "Monitor latency to a network target and alert when it goes down")]
struct Args {
    /// Config file (TOML, JSON or YAML). Defaults to ./pingwatch.* if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to probe
    #[arg(short, long)]
    target: Option<String>,

    /// Seconds between checks (minimum 5)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Durable log file
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Run a single check, print it and exit
    #[arg(long, conflicts_with = "summary")]
    once: bool,

    /// Print the summary rebuilt from the log file as JSON and exit
    #[arg(long)]
    summary: bool,

    /// Diagnostic log level (e.g. "debug"); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            target: self.target.clone(),
            interval_seconds: self.interval,
            log_file: self.log_file.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref())?;

    let mut settings = Settings::load(args.config.as_deref()).context("failed to load configuration")?;
    settings.apply(&args.overrides());

    // Summary mode only reads the log
    if args.summary {
        return print_summary(&settings);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings, args.once))
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(format!(
            "pingwatch={0},pingwatch_cli={0},pingwatch_monitor={0}",
            level
        ))
        .with_context(|| format!("invalid log level: {}", level))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("pingwatch=info,pingwatch_cli=info,pingwatch_monitor=info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn print_summary(settings: &Settings) -> Result<()> {
    let path = &settings.monitoring.log_file;
    let history = SharedHistory::new(settings.monitoring.max_history);
    let report = history
        .rehydrate_from_file(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let document = SummaryReport {
        log_file: path.display().to_string(),
        applied: report.applied,
        skipped: report.skipped,
        summary: history.summary(),
    };
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn run(settings: Settings, once: bool) -> Result<()> {
    let config = settings.monitor_config();
    config.validate()?;

    let _lock = InstanceLock::acquire(InstanceLock::default_path())?;

    let sink = LogSink::file(&settings.monitoring.log_file);
    sink.touch()
        .await
        .with_context(|| format!("cannot open log file {}", settings.monitoring.log_file.display()))?;

    let mut builder = Monitor::builder()
        .config(config.clone())
        .probe_arc(settings.probe())
        .sink(sink.clone())
        .on_status(|update| println!("{}", console::tick_line(update)));

    match notifier(&settings)? {
        Some(notifier) => builder = builder.notifier(notifier),
        None => warn!("alert notifications disabled (no notify.webhook_url configured)"),
    }

    let mut monitor = builder.build();
    let report = monitor.rehydrate_from_log()?;
    if report.skipped > 0 {
        debug!("skipped {} non-measurement log lines", report.skipped);
    }

    if once {
        monitor.tick_once().await?;
        return Ok(());
    }

    println!(
        "{}\n",
        console::banner(
            monitor.target(),
            config.check_interval.as_secs(),
            config.latency_threshold_ms,
            config.failure_threshold
        )
    );

    monitor.start();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("shutting down");
    monitor.stop().await;
    sink.append_event("Monitor stopped by user").await;

    println!("\n{}", monitor.summary());
    Ok(())
}

fn notifier(settings: &Settings) -> Result<Option<Arc<dyn Notifier>>> {
    let Some(url) = &settings.notify.webhook_url else {
        return Ok(None);
    };
    let timeout = Duration::from_secs(settings.notify.timeout_seconds);
    let webhook = WebhookNotifier::new(url.clone(), timeout)?;
    if settings.notify.recipient.is_none() {
        warn!("notify.webhook_url is set but notify.recipient is not; alerts will not be sent");
    }
    info!(
        "alert notifications enabled via {} (recipient: {})",
        webhook.url(),
        settings.notify.recipient.as_deref().unwrap_or("none")
    );
    Ok(Some(Arc::new(webhook)))
}
