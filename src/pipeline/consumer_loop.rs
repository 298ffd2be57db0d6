//! Fixed-cadence consumer loop.
//!
//! Every tick: snapshot the latest reading, classify its angle pair, feed the
//! label to the escalation machine and emit a [`PostureEvent`] to the sink.
//! The loop never touches the serial link and never waits on the reader;
//! a stale reading is classified like any other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::escalation::EscalationMachine;
use super::sink::EventSink;
use super::LatestState;
use crate::classifier::PostureClassifier;
use crate::config::ConsumerConfig;
use crate::types::{LatestReading, PostureEvent, Severity};

/// Counters accumulated over one loop lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub polls: u64,
    pub sink_errors: u64,
    /// Number of times severity entered `DangerousSustained`
    pub sustained_alarms: u64,
    /// Number of stale-input warnings logged
    pub stale_warnings: u64,
}

/// Owns the escalation state; sole writer, so no synchronisation.
pub struct ConsumerLoop {
    latest: Arc<LatestState>,
    classifier: Arc<dyn PostureClassifier>,
    machine: EscalationMachine,
    sink: Box<dyn EventSink>,
    cancel_token: CancellationToken,
    poll_interval: Duration,
    stale_warning: Duration,
    last_sequence: u64,
    last_fresh_at: Option<Instant>,
    stale_reported: bool,
    stats: ConsumerStats,
}

impl ConsumerLoop {
    pub fn new(
        latest: Arc<LatestState>,
        classifier: Arc<dyn PostureClassifier>,
        sink: Box<dyn EventSink>,
        cancel_token: CancellationToken,
    ) -> Self {
        let defaults = ConsumerConfig::default();
        Self {
            latest,
            classifier,
            machine: EscalationMachine::default(),
            sink,
            cancel_token,
            poll_interval: defaults.poll_interval(),
            stale_warning: defaults.stale_warning(),
            last_sequence: 0,
            last_fresh_at: None,
            stale_reported: false,
            stats: ConsumerStats::default(),
        }
    }

    /// Apply poll cadence and stale-warning settings.
    pub fn with_config(mut self, config: &ConsumerConfig) -> Self {
        self.poll_interval = config.poll_interval();
        self.stale_warning = config.stale_warning();
        self
    }

    /// Replace the escalation threshold.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.machine = EscalationMachine::new(threshold);
        self
    }

    pub fn severity(&self) -> Severity {
        self.machine.severity()
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// One poll cycle at `now`.
    pub fn poll_once(&mut self, now: Instant) -> PostureEvent {
        let reading = self.latest.get();
        self.track_freshness(&reading, now);

        let angles = reading.angles;
        let classification = self
            .classifier
            .classify(angles.lumbar_angle, angles.hip_angle);

        let previous = self.machine.severity();
        let severity = self.machine.update(classification.label, now);
        if severity == Severity::DangerousSustained && previous != Severity::DangerousSustained {
            self.stats.sustained_alarms += 1;
        }

        let event = PostureEvent::new(angles, classification, severity);
        if let Err(e) = self.sink.emit(&event) {
            self.stats.sink_errors += 1;
            warn!(error = %e, "[ConsumerLoop] Failed to emit posture event");
        }

        self.stats.polls += 1;
        event
    }

    /// Log once when input goes quiet and once when it resumes.
    ///
    /// Staleness alone never changes severity; the last sample is still classified.
    fn track_freshness(&mut self, reading: &LatestReading, now: Instant) {
        if reading.sequence != self.last_sequence {
            self.last_sequence = reading.sequence;
            self.last_fresh_at = Some(now);
            if self.stale_reported {
                self.stale_reported = false;
                info!(sequence = reading.sequence, "[ConsumerLoop] Sensor readings resumed");
            }
            return;
        }

        let fresh_at = *self.last_fresh_at.get_or_insert(now);
        let silent_for = now.saturating_duration_since(fresh_at);
        if !self.stale_reported && silent_for >= self.stale_warning {
            self.stale_reported = true;
            self.stats.stale_warnings += 1;
            warn!(
                silent_secs = silent_for.as_secs_f64(),
                severity = %self.machine.severity(),
                "[ConsumerLoop] No new sensor reading, classifying last known sample"
            );
        }
    }

    /// Poll at the configured cadence until cancelled.
    pub async fn run(mut self) -> ConsumerStats {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "[ConsumerLoop] Polling latest reading"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[ConsumerLoop] Shutdown signal received");
                    break;
                }
                tick = interval.tick() => {
                    self.poll_once(tick.into_std());
                }
            }
        }

        info!(
            polls = self.stats.polls,
            sustained_alarms = self.stats.sustained_alarms,
            sink_errors = self.stats.sink_errors,
            "[ConsumerLoop] Stopped"
        );
        self.stats
    }
}
