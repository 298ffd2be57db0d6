//! Posture event sinks.
//!
//! The consumer loop hands every [`PostureEvent`] to one sink. Sinks are
//! fallible; the loop logs a failed emit and carries on.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::types::{PostureEvent, Severity};

/// Destination for consumer-loop output.
pub trait EventSink: Send + 'static {
    fn emit(&mut self, event: &PostureEvent) -> Result<()>;
}

/// Structured log output, one line per event plus severity transitions.
///
/// Starts from `Normal`, the escalation machine's initial state, so the very
/// first dangerous event is reported as a transition.
#[derive(Debug, Default)]
pub struct LogSink {
    last_severity: Severity,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `severity`, returning `(from, to)` when it differs from the last one.
    fn transition(&mut self, severity: Severity) -> Option<(Severity, Severity)> {
        let previous = std::mem::replace(&mut self.last_severity, severity);
        (previous != severity).then_some((previous, severity))
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &PostureEvent) -> Result<()> {
        if let Some((_, to)) = self.transition(event.severity) {
            match to {
                Severity::DangerousSustained => warn!(
                    lumbar = event.lumbar_angle,
                    hip = event.hip_angle,
                    "🚨 Dangerous posture sustained, alarm raised"
                ),
                Severity::Dangerous => info!("⚠️  Dangerous posture detected, timer started"),
                Severity::Normal => info!("✓ Posture back to safe"),
            }
        }

        info!(severity = %event.severity, "{}", event);
        Ok(())
    }
}

/// Newline-delimited JSON, one object per event.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &PostureEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event).context("Failed to serialize posture event")?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .context("Failed to write posture event")?;
        Ok(())
    }
}

/// Collects events in memory, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct VecSink {
    pub events: std::sync::Arc<std::sync::Mutex<Vec<PostureEvent>>>,
}

impl EventSink for VecSink {
    fn emit(&mut self, event: &PostureEvent) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("event buffer lock poisoned"))?;
        events.push(event.clone());
        Ok(())
    }
}
