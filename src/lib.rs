//! Posture Monitor: wearable posture telemetry and sustained-risk escalation
//!
//! A background reader parses `NAME: value` telemetry lines from the rig,
//! derives lumbar and hip angles and publishes them to a single-slot cell. A
//! fixed-cadence consumer classifies the latest angles and escalates to
//! `DangerousSustained` after a continuous dangerous run.
//!
//! ## Modules
//!
//! - **acquisition**: line sources, the line parser, angle derivation, the sensor reader
//! - **classifier**: the posture model seam and the logistic artifact
//! - **pipeline**: latest-state cell, escalation machine, sinks, consumer loop
//! - **config**: TOML configuration and default constants

pub mod acquisition;
pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod types;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    Classification, DerivedAngles, LatestReading, PostureEvent, PostureLabel, RawChannels,
    Severity,
};

// Re-export pipeline components
pub use acquisition::{run_reader, ReaderError, ReaderStats, SensorReader};
pub use classifier::{ClassifierError, LogisticModel, PostureClassifier};
pub use pipeline::{ConsumerLoop, ConsumerStats, EscalationMachine, EventSink, LatestState};
