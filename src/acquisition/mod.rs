//! Sensor data acquisition module
//!
//! Handles telemetry ingestion from the wearable rig: line sources, the
//! `NAME: value` line parser, angle derivation and the background reader.

pub mod angles;
pub mod line_parser;
pub mod sensor_reader;
pub mod source;

pub use angles::derive_angles;
pub use line_parser::parse_line;
pub use sensor_reader::{run_reader, LineOutcome, ReaderError, ReaderStats, SensorReader};
pub use source::{BufReadSource, LineRead, LineSource, ReplaySource, SerialSource};
