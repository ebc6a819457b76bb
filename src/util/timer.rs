//! Monotonic phase timer for pipeline diagnostics.

use std::time::{Duration, Instant};

/// Stopwatch for a labeled pipeline phase.
///
/// Phases report as `[TIMER] <phase>: <ms> ms` on stdout so runs can be
/// compared from plain logs.
#[derive(Debug, Clone, Copy)]
pub struct Timer(Instant);

impl Timer {
    /// Start timing.
    pub fn start() -> Self {
        Self(Instant::now())
    }

    /// Elapsed time since [`start`](Timer::start).
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    /// Print the diagnostic line for a finished phase and return its duration.
    pub fn report(&self, phase: &str) -> Duration {
        let elapsed = self.elapsed();
        println!("[TIMER] {}: {:.2} ms", phase, elapsed.as_secs_f64() * 1_000.0);
        elapsed
    }
}
