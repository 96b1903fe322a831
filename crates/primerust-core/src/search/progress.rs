//! Progress reporting for the candidate search.
//!
//! The coordinator pushes structured [`ProgressSnapshot`]s to a
//! [`ProgressSink`]; rendering is entirely the sink's concern.
//!
//! # ETA Model
//!
//! By the prime number theorem a random integer near $10^d$ is prime with
//! probability $\approx 1 / (d \ln 10)$. Sampling only odd integers doubles
//! that, so a search expects $d \ln 10 / 2$ attempts. For $d = 1$ three of
//! the five odd values (3, 5, 7) are prime, giving $5/3$.

use std::f64::consts::LN_10;

use crate::RunMetrics;

/// Periodic state of a running search.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub digit_count: u32,
    pub attempts: u64,
    pub elapsed_seconds: f64,
    pub numbers_per_second: f64,
    pub cpu_percent: f64,
    /// `None` until throughput is measurable.
    pub eta_seconds: Option<f64>,
}

/// Receiver of progress updates. Called from the coordinator thread only.
pub trait ProgressSink {
    /// A periodic snapshot, at most once per poll interval.
    fn on_progress(&self, snapshot: &ProgressSnapshot);

    /// Terminal event of a successful search.
    fn on_found(&self, _metrics: &RunMetrics) {}
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _snapshot: &ProgressSnapshot) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressSnapshot),
{
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Expected number of odd candidates drawn before a prime appears.
#[inline]
pub fn expected_attempts(digit_count: u32) -> f64 {
    if digit_count <= 1 {
        return 5.0 / 3.0;
    }
    digit_count as f64 * LN_10 / 2.0
}

/// Estimated seconds remaining at the current throughput.
///
/// Returns `None` while no throughput has been measured. Once the attempt
/// count passes the expectation the estimate clamps to zero.
pub fn eta_seconds(digit_count: u32, attempts: u64, numbers_per_second: f64) -> Option<f64> {
    if numbers_per_second <= 0.0 || !numbers_per_second.is_finite() {
        return None;
    }
    let remaining = (expected_attempts(digit_count) - attempts as f64).max(0.0);
    Some(remaining / numbers_per_second)
}
