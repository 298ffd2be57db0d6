//! Sensor Reader
//!
//! Owns the telemetry line source and runs the blocking read loop:
//!
//! 1. Read one line (bounded by the source's read timeout; a timeout is a retry)
//! 2. Decode to text, dropping bytes that are not valid UTF-8
//! 3. Skip empty lines
//! 4. Parse `NAME: value` fields; skip lines with no fields
//! 5. Derive angles and publish a whole new [`LatestReading`]
//!
//! A hard I/O error ends the loop with a single error log. There is no
//! automatic reconnection: the shared reading simply stops advancing and the
//! consumer keeps working from the last published sample.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::angles::derive_angles;
use super::line_parser::parse_line;
use super::source::{LineRead, LineSource};
use crate::config::defaults::MAX_LINE_BYTES;
use crate::pipeline::LatestState;
use crate::types::{DerivedAngles, LatestReading, RawChannels};

/// Sensor reader errors
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Failed to open {port}: {message}")]
    Open { port: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reader task failed: {0}")]
    Join(String),
}

/// Counters accumulated over one reader lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    pub lines_read: u64,
    pub readings_published: u64,
    pub empty_lines: u64,
    pub unparsed_lines: u64,
    pub timeouts: u64,
}

/// What happened to a single line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineOutcome {
    Empty,
    Unparsed,
    Published(DerivedAngles),
}

/// Blocking read loop publishing into the shared latest-state cell.
pub struct SensorReader<S: LineSource> {
    source: S,
    latest: Arc<LatestState>,
    sequence: u64,
    max_line_bytes: usize,
    stats: ReaderStats,
}

impl<S: LineSource> SensorReader<S> {
    pub fn new(source: S, latest: Arc<LatestState>) -> Self {
        Self {
            source,
            latest,
            sequence: 0,
            max_line_bytes: MAX_LINE_BYTES,
            stats: ReaderStats::default(),
        }
    }

    /// Override the line length cap.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Decode, parse, derive and publish one raw line.
    pub fn process_line(&mut self, bytes: &[u8]) -> LineOutcome {
        self.stats.lines_read += 1;

        let text = decode_dropping_invalid(bytes);
        let line = text.trim();
        if line.is_empty() {
            self.stats.empty_lines += 1;
            return LineOutcome::Empty;
        }

        let fields = parse_line(line);
        if fields.is_empty() {
            self.stats.unparsed_lines += 1;
            debug!(line = %line, "[SensorReader] No fields recognised, keeping previous reading");
            return LineOutcome::Unparsed;
        }

        let raw = RawChannels::from_fields(&fields);
        let angles = derive_angles(&raw);
        self.sequence += 1;
        self.latest.set(LatestReading::new(raw, angles, self.sequence));
        self.stats.readings_published += 1;

        LineOutcome::Published(angles)
    }

    /// Run until EOF, cancellation, or a fatal I/O error.
    ///
    /// Cancellation is checked between reads, so shutdown latency is bounded
    /// by the source's read timeout. The source is dropped on every return.
    pub fn run(mut self, cancel: &CancellationToken) -> Result<ReaderStats, ReaderError> {
        info!(
            source = %self.source.source_name(),
            "[SensorReader] Read loop started"
        );

        let mut buf = Vec::with_capacity(256);
        loop {
            if cancel.is_cancelled() {
                info!("[SensorReader] Shutdown signal received");
                break;
            }

            match self.source.read_line(&mut buf)? {
                LineRead::Line => {
                    if buf.len() > self.max_line_bytes {
                        self.discard_oversized(&mut buf);
                    } else {
                        self.process_line(&buf);
                        buf.clear();
                    }
                }
                LineRead::Timeout => {
                    self.stats.timeouts += 1;
                    if buf.len() > self.max_line_bytes {
                        self.discard_oversized(&mut buf);
                    }
                }
                LineRead::Eof => {
                    info!(
                        lines = self.stats.lines_read,
                        "[SensorReader] Source reached end"
                    );
                    break;
                }
            }
        }

        Ok(self.stats)
    }

    /// Drop a line that outgrew the cap; it counts as unparsed.
    fn discard_oversized(&mut self, buf: &mut Vec<u8>) {
        warn!(
            bytes = buf.len(),
            limit = self.max_line_bytes,
            "[SensorReader] Line exceeds maximum length, discarding"
        );
        self.stats.lines_read += 1;
        self.stats.unparsed_lines += 1;
        buf.clear();
    }
}

/// Open a source, wait out the hardware settle delay, then run the blocking
/// loop on the blocking thread pool.
///
/// Any failure (including failing to open) is logged once here and returned;
/// it never cancels the rest of the process.
pub async fn run_reader<S, F>(
    open: F,
    latest: Arc<LatestState>,
    settle_delay: Duration,
    cancel: CancellationToken,
) -> Result<ReaderStats, ReaderError>
where
    S: LineSource,
    F: FnOnce() -> Result<S, ReaderError> + Send + 'static,
{
    let result = run_reader_inner(open, latest, settle_delay, cancel).await;
    match &result {
        Ok(stats) => info!(
            lines = stats.lines_read,
            published = stats.readings_published,
            skipped = stats.empty_lines + stats.unparsed_lines,
            timeouts = stats.timeouts,
            "[SensorReader] Stopped"
        ),
        Err(e) => error!(
            error = %e,
            "[SensorReader] Fatal error, reader stopped (latest reading will no longer advance)"
        ),
    }
    result
}

async fn run_reader_inner<S, F>(
    open: F,
    latest: Arc<LatestState>,
    settle_delay: Duration,
    cancel: CancellationToken,
) -> Result<ReaderStats, ReaderError>
where
    S: LineSource,
    F: FnOnce() -> Result<S, ReaderError> + Send + 'static,
{
    let source = tokio::task::spawn_blocking(open)
        .await
        .map_err(|e| ReaderError::Join(e.to_string()))??;

    if !settle_delay.is_zero() {
        info!(
            settle_ms = settle_delay.as_millis() as u64,
            "[SensorReader] Waiting for sensor to settle"
        );
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("[SensorReader] Shutdown signal received during settle delay");
                return Ok(ReaderStats::default());
            }
            _ = tokio::time::sleep(settle_delay) => {}
        }
    }

    let reader = SensorReader::new(source, latest);
    tokio::task::spawn_blocking(move || reader.run(&cancel))
        .await
        .map_err(|e| ReaderError::Join(e.to_string()))?
}

/// UTF-8 decode that silently drops invalid byte sequences.
fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}
