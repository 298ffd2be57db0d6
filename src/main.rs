//! Posture Monitor - wearable posture telemetry and sustained-risk alarm
//!
//! Reads `NAME: value` telemetry from the rig's serial link, classifies the
//! wearer's lumbar and hip angles ten times a second and raises an alarm when
//! a dangerous posture is held continuously.
//!
//! # Usage
//!
//! ```bash
//! # Live rig on the configured serial port
//! ./posture-monitor --port /dev/ttyACM0
//!
//! # Simulated telemetry
//! ./posture-sim | ./posture-monitor --stdin
//!
//! # Replay a recorded session as JSON lines
//! ./posture-monitor --replay session.log --json
//! ```
//!
//! # Environment Variables
//!
//! - `POSTURE_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use posture_monitor::acquisition::{
    run_reader, BufReadSource, LineSource, ReaderError, ReplaySource, SerialSource,
};
use posture_monitor::classifier::{LogisticModel, PostureClassifier};
use posture_monitor::config::{self, MonitorConfig};
use posture_monitor::pipeline::{ConsumerLoop, EventSink, JsonLinesSink, LatestState, LogSink};

/// Time allowed for tasks to wind down after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "posture-monitor")]
#[command(about = "Wearable posture telemetry monitor with sustained-risk alarm")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (must exist and be valid)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the serial device path
    #[arg(short, long)]
    port: Option<String>,

    /// Override the serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Override the model artifact path
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Read telemetry lines from stdin instead of the serial port
    /// Use with the simulator: ./posture-sim | ./posture-monitor --stdin
    #[arg(long, conflicts_with = "replay")]
    stdin: bool,

    /// Replay a recorded telemetry file instead of the serial port
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Delay between replayed lines (ms)
    #[arg(long, default_value_t = config::defaults::REPLAY_LINE_DELAY_MS)]
    replay_delay_ms: u64,

    /// Emit posture events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Format log output as JSON
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskName {
    SensorReader,
    ConsumerLoop,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::SensorReader => write!(f, "SensorReader"),
            TaskName::ConsumerLoop => write!(f, "ConsumerLoop"),
        }
    }
}

/// Supervise the reader and consumer until shutdown.
///
/// The reader ending, cleanly or not, leaves the consumer running on the last
/// reading. The consumer ending or any task panicking stops the process.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(TaskName::SensorReader))) => {
                        warn!("🔒 Supervisor: SensorReader exited, consumer continues on last reading");
                    }
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed", task_name);
                        cancel_token.cancel();
                        break;
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Spawn the sensor reader for any line source.
///
/// A reader error has already been logged by `run_reader`; it is not
/// propagated so the supervisor keeps the consumer alive.
fn spawn_reader<S, F>(
    task_set: &mut JoinSet<Result<TaskName>>,
    open: F,
    latest: Arc<LatestState>,
    settle_delay: Duration,
    cancel_token: CancellationToken,
) where
    S: LineSource,
    F: FnOnce() -> Result<S, ReaderError> + Send + 'static,
{
    task_set.spawn(async move {
        let _ = run_reader(open, latest, settle_delay, cancel_token).await;
        Ok(TaskName::SensorReader)
    });
}

// ============================================================================
// Startup
// ============================================================================

/// Resolve configuration: explicit file, else the standard search, then CLI overrides.
fn load_config(args: &CliArgs) -> Result<MonitorConfig> {
    let mut monitor_config = match &args.config {
        Some(path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::load(),
    };

    if let Some(port) = &args.port {
        monitor_config.serial.port.clone_from(port);
    }
    if let Some(baud) = args.baud {
        monitor_config.serial.baud_rate = baud;
    }
    if let Some(model) = &args.model {
        monitor_config.classifier.model_path.clone_from(model);
    }

    monitor_config
        .validate()
        .context("Invalid configuration after CLI overrides")?;
    Ok(monitor_config)
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let cfg = config::init(load_config(&args)?);

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Posture Monitor");
    info!("  Wearable posture telemetry with sustained-risk alarm");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // The model must load before anything is spawned
    let model = LogisticModel::load(&cfg.classifier.model_path).with_context(|| {
        format!(
            "Failed to load posture model {}",
            cfg.classifier.model_path.display()
        )
    })?;
    let classifier: Arc<dyn PostureClassifier> = Arc::new(model);

    info!(
        "⏱️  Poll: {}ms | Alarm after {:.1}s continuous dangerous posture",
        cfg.consumer.poll_interval_ms, cfg.escalation.sustained_threshold_secs
    );

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let latest = Arc::new(LatestState::new());

    info!("🔒 Supervisor: Initializing task monitoring");
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: Sensor Reader
    if args.stdin {
        info!("📥 Input: stdin (telemetry lines)");
        spawn_reader(
            &mut task_set,
            || Ok(BufReadSource::stdin()),
            Arc::clone(&latest),
            Duration::ZERO,
            cancel_token.clone(),
        );
    } else if let Some(path) = args.replay.clone() {
        info!("📥 Input: replay {} ({}ms/line)", path.display(), args.replay_delay_ms);
        let delay = Duration::from_millis(args.replay_delay_ms);
        spawn_reader(
            &mut task_set,
            move || ReplaySource::open(&path, delay),
            Arc::clone(&latest),
            Duration::ZERO,
            cancel_token.clone(),
        );
    } else {
        let serial = cfg.serial.clone();
        info!("📥 Input: serial {} @ {} baud", serial.port, serial.baud_rate);
        let settle_delay = serial.settle_delay();
        spawn_reader(
            &mut task_set,
            move || SerialSource::open(&serial.port, serial.baud_rate, serial.read_timeout()),
            Arc::clone(&latest),
            settle_delay,
            cancel_token.clone(),
        );
    }

    // Task 2: Consumer Loop
    let sink: Box<dyn EventSink> = if args.json {
        Box::new(JsonLinesSink::stdout())
    } else {
        Box::new(LogSink::new())
    };
    let consumer = ConsumerLoop::new(latest, classifier, sink, cancel_token.clone())
        .with_config(&cfg.consumer)
        .with_threshold(cfg.escalation.threshold());
    task_set.spawn(async move {
        let stats = consumer.run().await;
        info!(
            polls = stats.polls,
            alarms = stats.sustained_alarms,
            stale_warnings = stats.stale_warnings,
            "[ConsumerLoop] Final statistics"
        );
        Ok(TaskName::ConsumerLoop)
    });

    let result = run_supervisor(&mut task_set, cancel_token.clone()).await;

    // Drain remaining tasks; a reader blocked on stdin cannot observe cancellation
    cancel_token.cancel();
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while task_set.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "🔒 Supervisor: Tasks still running after grace period, exiting anyway"
        );
        if let Err(e) = &result {
            error!("Exiting with error: {:#}", e);
            std::process::exit(1);
        }
        std::process::exit(0);
    }

    info!("✓ Posture Monitor stopped");
    result
}
