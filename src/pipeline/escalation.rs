//! Sustained-danger escalation state machine
//!
//! ```text
//!            Safe (any state)
//!   ┌──────────────────────────────────────────┐
//!   ▼                                          │
//! Normal ──Dangerous──► Dangerous ──≥ threshold──► DangerousSustained
//!                          ▲  │ < threshold
//!                          └──┘
//! ```
//!
//! A single `Safe` label clears the timer immediately; there is no partial
//! decay. The threshold is inclusive, so the sample landing exactly on it is
//! the one that escalates. Lack of input never changes severity.

use std::time::{Duration, Instant};

use crate::config::defaults::SUSTAINED_DANGER_THRESHOLD_SECS;
use crate::types::{PostureLabel, Severity};

/// Tracks how long `Dangerous` has been continuously observed.
#[derive(Debug, Clone)]
pub struct EscalationMachine {
    threshold: Duration,
    severity: Severity,
    dangerous_since: Option<Instant>,
}

impl EscalationMachine {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            severity: Severity::Normal,
            dangerous_since: None,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn dangerous_since(&self) -> Option<Instant> {
        self.dangerous_since
    }

    /// How long the current dangerous run has lasted as of `now`.
    pub fn dangerous_for(&self, now: Instant) -> Option<Duration> {
        self.dangerous_since
            .map(|since| now.saturating_duration_since(since))
    }

    /// Feed one classifier label observed at `now` and return the new severity.
    pub fn update(&mut self, label: PostureLabel, now: Instant) -> Severity {
        self.severity = match (label, self.dangerous_since) {
            (PostureLabel::Safe, _) => {
                self.dangerous_since = None;
                Severity::Normal
            }
            (PostureLabel::Dangerous, None) => {
                self.dangerous_since = Some(now);
                Severity::Dangerous
            }
            (PostureLabel::Dangerous, Some(since)) => {
                if now.saturating_duration_since(since) >= self.threshold {
                    Severity::DangerousSustained
                } else {
                    Severity::Dangerous
                }
            }
        };
        self.severity
    }
}

impl Default for EscalationMachine {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(SUSTAINED_DANGER_THRESHOLD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_initial_state() {
        let machine = EscalationMachine::default();
        assert_eq!(machine.severity(), Severity::Normal);
        assert!(machine.dangerous_since().is_none());
    }

    #[test]
    fn test_nine_seconds_at_one_hz_never_sustains() {
        let base = Instant::now();
        let mut machine = EscalationMachine::default();

        // t = 0..=9 → 10 samples, but the run has only lasted 9 s
        for i in 0..10 {
            let severity = machine.update(PostureLabel::Dangerous, at(base, f64::from(i)));
            assert_eq!(severity, Severity::Dangerous, "sample at t={i}s");
        }
    }

    #[test]
    fn test_boundary_sample_escalates() {
        let base = Instant::now();
        let mut machine = EscalationMachine::default();

        for i in 0..10 {
            machine.update(PostureLabel::Dangerous, at(base, f64::from(i)));
        }
        assert_eq!(
            machine.update(PostureLabel::Dangerous, at(base, 10.0)),
            Severity::DangerousSustained
        );
        // Stays sustained while danger continues
        assert_eq!(
            machine.update(PostureLabel::Dangerous, at(base, 25.0)),
            Severity::DangerousSustained
        );
        assert_eq!(machine.dangerous_since(), Some(base));
    }

    #[test]
    fn test_just_below_threshold_stays_dangerous() {
        let base = Instant::now();
        let mut machine = EscalationMachine::default();

        machine.update(PostureLabel::Dangerous, base);
        assert_eq!(
            machine.update(PostureLabel::Dangerous, at(base, 9.999)),
            Severity::Dangerous
        );
    }

    #[test]
    fn test_safe_label_resets_and_requires_fresh_run() {
        let base = Instant::now();
        let mut machine = EscalationMachine::default();

        for i in 0..=8 {
            machine.update(PostureLabel::Dangerous, at(base, f64::from(i)));
        }
        assert_eq!(machine.update(PostureLabel::Safe, at(base, 9.0)), Severity::Normal);
        assert!(machine.dangerous_since().is_none());

        // Fresh run starts at t = 10; t = 19 is only 9 s in
        for i in 10..=19 {
            assert_eq!(
                machine.update(PostureLabel::Dangerous, at(base, f64::from(i))),
                Severity::Dangerous
            );
        }
        assert_eq!(
            machine.update(PostureLabel::Dangerous, at(base, 20.0)),
            Severity::DangerousSustained
        );
    }

    #[test]
    fn test_safe_from_sustained_goes_straight_to_normal() {
        let base = Instant::now();
        let mut machine = EscalationMachine::default();

        machine.update(PostureLabel::Dangerous, base);
        machine.update(PostureLabel::Dangerous, at(base, 12.0));
        assert_eq!(machine.severity(), Severity::DangerousSustained);

        assert_eq!(machine.update(PostureLabel::Safe, at(base, 12.1)), Severity::Normal);
    }

    #[test]
    fn test_custom_threshold() {
        let base = Instant::now();
        let mut machine = EscalationMachine::new(Duration::from_secs(3));

        machine.update(PostureLabel::Dangerous, base);
        assert_eq!(
            machine.update(PostureLabel::Dangerous, at(base, 3.0)),
            Severity::DangerousSustained
        );
        assert_eq!(machine.dangerous_for(at(base, 4.5)), Some(Duration::from_millis(4500)));
    }
}
