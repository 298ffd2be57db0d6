//! Core data types for posture telemetry
//!
//! Everything that crosses a module boundary lives here: the raw channel
//! quintuple parsed off the serial link, the derived angle pair, the shared
//! latest reading, classifier output, escalation severity and the emitted
//! posture event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Channel Names
// ============================================================================

/// Serial channel identifiers as they appear on the wire.
pub mod channels {
    pub const R: &str = "R";
    pub const MB: &str = "MB";
    pub const MM: &str = "MM";
    pub const MT: &str = "MT";
    pub const L: &str = "L";

    /// All five channels in wire order.
    pub const ALL: [&str; 5] = [R, MB, MM, MT, L];
}

// ============================================================================
// Raw Channels
// ============================================================================

/// The five load/angle channels reported by the sensor rig.
///
/// Any channel absent from a line is 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct RawChannels {
    pub R: f64,
    pub MB: f64,
    pub MM: f64,
    pub MT: f64,
    pub L: f64,
}

impl RawChannels {
    /// Build from a parsed `name -> value` mapping, defaulting missing channels.
    ///
    /// Unrecognised names in the mapping are ignored.
    pub fn from_fields(fields: &HashMap<String, f64>) -> Self {
        let get = |name: &str| fields.get(name).copied().unwrap_or(0.0);
        Self {
            R: get(channels::R),
            MB: get(channels::MB),
            MM: get(channels::MM),
            MT: get(channels::MT),
            L: get(channels::L),
        }
    }
}

// ============================================================================
// Derived Angles
// ============================================================================

/// Lumbar and hip angles (degrees) computed from [`RawChannels`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedAngles {
    pub lumbar_angle: f64,
    pub hip_angle: f64,
}

// ============================================================================
// Latest Reading
// ============================================================================

/// One complete sample as published by the sensor reader.
///
/// Always replaced as a whole; `sequence` is 0 until the first publish and
/// increases by one with every published sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestReading {
    pub raw: RawChannels,
    pub angles: DerivedAngles,
    /// Wall-clock receipt time, `None` before the first sample
    pub received_at: Option<DateTime<Utc>>,
    pub sequence: u64,
}

impl LatestReading {
    pub fn new(raw: RawChannels, angles: DerivedAngles, sequence: u64) -> Self {
        Self {
            raw,
            angles,
            received_at: Some(Utc::now()),
            sequence,
        }
    }

    /// True until the reader has published at least one sample.
    pub fn is_initial(&self) -> bool {
        self.sequence == 0
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Binary posture label produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostureLabel {
    Safe,
    Dangerous,
}

impl std::fmt::Display for PostureLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostureLabel::Safe => write!(f, "Safe"),
            PostureLabel::Dangerous => write!(f, "Dangerous"),
        }
    }
}

/// Classifier output for a single angle pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: PostureLabel,
    /// Confidence in `label`, in [0, 1]
    pub confidence: f64,
}

// ============================================================================
// Severity
// ============================================================================

/// Three-level output of the escalation state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Normal,
    Dangerous,
    DangerousSustained,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Normal => write!(f, "Normal"),
            Severity::Dangerous => write!(f, "Dangerous"),
            Severity::DangerousSustained => write!(f, "DangerousSustained"),
        }
    }
}

// ============================================================================
// Posture Event
// ============================================================================

/// One consumer-loop output, handed to the configured sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostureEvent {
    pub lumbar_angle: f64,
    pub hip_angle: f64,
    pub label: PostureLabel,
    pub confidence: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl PostureEvent {
    pub fn new(angles: DerivedAngles, classification: Classification, severity: Severity) -> Self {
        Self {
            lumbar_angle: angles.lumbar_angle,
            hip_angle: angles.hip_angle,
            label: classification.label,
            confidence: classification.confidence,
            severity,
            timestamp: Utc::now(),
        }
    }

    /// Operator-facing status, e.g. `Dangerous (87.3% confidence)` or `Dangerous (10s+)`.
    pub fn status_text(&self) -> String {
        if self.severity == Severity::DangerousSustained {
            return "Dangerous (10s+)".to_string();
        }
        format!("{} ({:.1}% confidence)", self.label, self.confidence * 100.0)
    }
}

impl std::fmt::Display for PostureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lumbar={:.2}, Hip={:.2} → {}",
            self.lumbar_angle,
            self.hip_angle,
            self.status_text()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_channels_defaults_missing_fields() {
        let mut fields = HashMap::new();
        fields.insert("MB".to_string(), 4.0);
        fields.insert("junk".to_string(), 99.0);

        let raw = RawChannels::from_fields(&fields);
        assert_eq!(raw.MB, 4.0);
        assert_eq!(raw.R, 0.0);
        assert_eq!(raw.L, 0.0);
    }

    #[test]
    fn test_latest_reading_default_is_initial() {
        let reading = LatestReading::default();
        assert!(reading.is_initial());
        assert!(reading.received_at.is_none());
        assert_eq!(reading.angles, DerivedAngles::default());
    }

    #[test]
    fn test_event_display() {
        let angles = DerivedAngles { lumbar_angle: 21.1666, hip_angle: 17.5 };
        let classification = Classification { label: PostureLabel::Dangerous, confidence: 0.873 };

        let event = PostureEvent::new(angles, classification, Severity::Dangerous);
        assert_eq!(event.to_string(), "Lumbar=21.17, Hip=17.50 → Dangerous (87.3% confidence)");

        let sustained = PostureEvent::new(angles, classification, Severity::DangerousSustained);
        assert_eq!(sustained.status_text(), "Dangerous (10s+)");
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(format!("{}", Severity::Normal), "Normal");
        assert_eq!(format!("{}", Severity::Dangerous), "Dangerous");
        assert_eq!(format!("{}", Severity::DangerousSustained), "DangerousSustained");
    }
}
