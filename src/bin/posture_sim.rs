//! Posture Telemetry Simulation
//!
//! Generates serial-format sensor lines for exercising the monitor without
//! the wearable rig. Alternates between a safe upright posture and a
//! dangerous forward bend, with Gaussian jitter on every channel.
//!
//! # Usage
//! ```bash
//! ./posture-sim --safe-secs 5 --danger-secs 15 | ./posture-monitor --stdin
//! ```

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::io::{self, ErrorKind, Write};
use std::time::{Duration, Instant};

use posture_monitor::types::channels;

// ============================================================================
// Posture Profiles
// ============================================================================

/// Mean channel values (R, MB, MM, MT, L) for an upright, neutral stance.
const SAFE_PROFILE: [f64; 5] = [12.0, 10.0, 14.0, 16.0, 13.0];

/// Mean channel values for a deep forward bend.
const DANGER_PROFILE: [f64; 5] = [30.0, 24.0, 28.0, 40.0, 32.0];

/// Per-channel jitter standard deviation.
const CHANNEL_SIGMA: f64 = 1.5;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "posture-sim")]
#[command(about = "Posture telemetry simulation for posture-monitor testing")]
#[command(version = "1.0")]
struct Args {
    /// Output line rate in Hz
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=1000))]
    rate: u32,

    /// Length of each safe phase (seconds)
    #[arg(long, default_value = "5")]
    safe_secs: f64,

    /// Length of each dangerous phase (seconds)
    #[arg(long, default_value = "15")]
    danger_secs: f64,

    /// Total run time in seconds (runs until interrupted when omitted)
    #[arg(long)]
    duration: Option<f64>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Probability that a line is replaced by junk or a blank line (0.0-1.0)
    #[arg(long, default_value = "0.02")]
    noise: f64,

    /// Suppress phase log on stderr
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Simulation Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Safe,
    Dangerous,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Safe => "Safe (upright)",
            Phase::Dangerous => "Dangerous (forward bend)",
        }
    }

    fn profile(self) -> &'static [f64; 5] {
        match self {
            Phase::Safe => &SAFE_PROFILE,
            Phase::Dangerous => &DANGER_PROFILE,
        }
    }

    /// Phase at `elapsed` seconds into a repeating safe→dangerous cycle.
    fn at(elapsed: f64, safe_secs: f64, danger_secs: f64) -> Self {
        let cycle = safe_secs + danger_secs;
        if cycle <= 0.0 || elapsed % cycle < safe_secs {
            Phase::Safe
        } else {
            Phase::Dangerous
        }
    }
}

// ============================================================================
// Line Generation
// ============================================================================

struct Simulator {
    rng: StdRng,
    jitter: Normal<f64>,
    noise: f64,
}

impl Simulator {
    fn new(seed: Option<u64>, noise: f64) -> Result<Self, rand_distr::NormalError> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            jitter: Normal::new(0.0, CHANNEL_SIGMA)?,
            noise: if noise.is_finite() { noise.clamp(0.0, 1.0) } else { 0.0 },
        })
    }

    fn line(&mut self, phase: Phase) -> String {
        if self.rng.gen_bool(self.noise) {
            return self.junk_line();
        }

        channels::ALL
            .iter()
            .zip(phase.profile())
            .map(|(name, mean)| format!("{name}: {:.2}", mean + self.jitter.sample(&mut self.rng)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Lines the monitor must tolerate: blank, garbage, or truncated.
    fn junk_line(&mut self) -> String {
        match self.rng.gen_range(0..3) {
            0 => String::new(),
            1 => "boot: ok ?? ###".to_string(),
            _ => format!("R: {:.2} MB:", SAFE_PROFILE[0]),
        }
    }
}

fn log_phase(elapsed: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{elapsed:>8.1}s] {message}");
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut sim = Simulator::new(args.seed, args.noise)?;
    let interval = Duration::from_secs_f64(1.0 / f64::from(args.rate));

    log_phase(0.0, &"=".repeat(60), args.quiet);
    log_phase(0.0, "POSTURE TELEMETRY SIMULATION", args.quiet);
    log_phase(0.0, &format!("  Rate: {} Hz", args.rate), args.quiet);
    log_phase(
        0.0,
        &format!("  Cycle: {:.1}s safe / {:.1}s dangerous", args.safe_secs, args.danger_secs),
        args.quiet,
    );
    if let Some(seed) = args.seed {
        log_phase(0.0, &format!("  Random seed: {seed}"), args.quiet);
    }
    log_phase(0.0, &"=".repeat(60), args.quiet);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let start = Instant::now();
    let mut current: Option<Phase> = None;

    loop {
        let loop_start = Instant::now();
        let elapsed = start.elapsed().as_secs_f64();
        if args.duration.is_some_and(|d| elapsed >= d) {
            break;
        }

        let phase = Phase::at(elapsed, args.safe_secs, args.danger_secs);
        if current != Some(phase) {
            log_phase(elapsed, &format!(">>> PHASE: {}", phase.name()), args.quiet);
            current = Some(phase);
        }

        let line = sim.line(phase);
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            // Downstream monitor went away
            if e.kind() == ErrorKind::BrokenPipe {
                break;
            }
            return Err(e.into());
        }

        if let Some(remaining) = interval.checked_sub(loop_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    log_phase(start.elapsed().as_secs_f64(), "SIMULATION COMPLETE", args.quiet);
    Ok(())
}
