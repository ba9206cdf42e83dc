//! Timing window and the aggregate throughput of a benchmark run

use std::fmt;
use std::time::{Duration, Instant};

use super::KeySpec;

/// Interval measured around worker launch and join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingWindow {
    pub start: Instant,
    pub end: Instant,
}

impl TimingWindow {
    /// Shortest interval used for the rate computation
    pub const RESOLUTION: Duration = Duration::from_micros(1);

    pub fn elapsed(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }

    /// Elapsed time in fractional seconds at microsecond resolution
    ///
    /// Never zero, so the rate stays finite for an instantaneous run.
    pub fn elapsed_seconds(&self) -> f64 {
        let micros = self.elapsed().as_micros().max(Self::RESOLUTION.as_micros());
        micros as f64 / 1_000_000.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputResult {
    pub spec: KeySpec,
    pub threads: usize,
    pub iterations: u64,
    pub elapsed_seconds: f64,
    /// `threads * iterations / elapsed_seconds`
    pub signatures_per_second: f64,
    /// Signatures the workers actually returned
    pub completed_signatures: u64,
    pub failed_workers: usize,
}

impl ThroughputResult {
    pub fn new(
        spec: KeySpec,
        threads: usize,
        iterations: u64,
        window: &TimingWindow,
        completed_signatures: u64,
        failed_workers: usize,
    ) -> Self {
        let elapsed_seconds = window.elapsed_seconds();
        let requested = threads as f64 * iterations as f64;
        Self {
            spec,
            threads,
            iterations,
            elapsed_seconds,
            signatures_per_second: requested / elapsed_seconds,
            completed_signatures,
            failed_workers,
        }
    }

    pub fn requested_signatures(&self) -> u64 {
        (self.threads as u64).saturating_mul(self.iterations)
    }

    pub fn is_undercounted(&self) -> bool {
        self.completed_signatures < self.requested_signatures()
    }
}

impl fmt::Display for ThroughputResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, {} signatures per thread, {:.2} sig/s ({}",
            self.threads,
            if self.threads == 1 { "thread" } else { "threads" },
            self.iterations,
            self.signatures_per_second,
            self.spec.algorithm().name(),
        )?;
        if let Some(bits) = self.spec.key_bits() {
            write!(f, " {} bits", bits)?;
        }
        f.write_str(")")
    }
}
