//! System-wide default constants.
//!
//! Grouped by subsystem. Config structs default to these values so a missing
//! `posture_config.toml` reproduces the stock rig behaviour.

// ============================================================================
// Serial Link
// ============================================================================

/// Device path of the rig's USB serial adapter.
pub const SERIAL_PORT: &str = "/dev/tty.usbmodem21101";

/// Serial baud rate.
pub const SERIAL_BAUD_RATE: u32 = 115_200;

/// Per-read timeout (ms). A timeout with no data is a retry, not an error.
pub const SERIAL_READ_TIMEOUT_MS: u64 = 1_000;

/// Delay after opening the port before data is trusted (ms).
///
/// The microcontroller resets when the port opens and prints boot noise.
pub const SERIAL_SETTLE_DELAY_MS: u64 = 2_000;

/// Longest line kept before the partial buffer is discarded (bytes).
///
/// A rig line is well under 100 bytes; anything past this is a stream with
/// no line terminator.
pub const MAX_LINE_BYTES: usize = 4_096;

// ============================================================================
// Classifier
// ============================================================================

/// Default location of the logistic model artifact.
pub const MODEL_PATH: &str = "model/posture_model.json";

// ============================================================================
// Escalation
// ============================================================================

/// Continuous dangerous duration before escalating to sustained (seconds).
pub const SUSTAINED_DANGER_THRESHOLD_SECS: f64 = 10.0;

// ============================================================================
// Consumer Loop
// ============================================================================

/// Consumer poll cadence (ms).
pub const POLL_INTERVAL_MS: u64 = 100;

/// Silence after which the consumer logs a stale-input warning (seconds).
pub const STALE_WARNING_SECS: f64 = 5.0;

// ============================================================================
// Replay
// ============================================================================

/// Default delay between lines when replaying a recorded file (ms).
pub const REPLAY_LINE_DELAY_MS: u64 = 100;
