//! Consumer Pipeline Module
//!
//! ```text
//! SensorReader ──set()──▶ LatestState ◀──get()── ConsumerLoop
//!                                                   │
//!                                   classify → escalate → EventSink
//! ```
//!
//! The reader and the consumer share exactly one value, the latest reading.
//! Neither side ever waits on the other.

mod consumer_loop;
mod escalation;
mod sink;
mod state;

pub use consumer_loop::{ConsumerLoop, ConsumerStats};
pub use escalation::EscalationMachine;
pub use sink::{EventSink, JsonLinesSink, LogSink, VecSink};
pub use state::LatestState;
