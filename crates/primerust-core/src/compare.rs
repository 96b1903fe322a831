//! Comparison of a run against the best recorded run.
//!
//! Every variation is signed so that a positive value means the current run
//! did better, whatever the metric's direction.

use std::fmt::Display;

use crate::history::HistoryRecord;
use crate::RunMetrics;

/// A compared metric, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Attempts,
    Time,
    NumbersPerSecond,
    CpuUsage,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Attempts,
        Metric::Time,
        Metric::NumbersPerSecond,
        Metric::CpuUsage,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Attempts => "Attempts",
            Metric::Time => "Time",
            Metric::NumbersPerSecond => "Numbers/Sec",
            Metric::CpuUsage => "CPU Usage",
        }
    }

    pub fn lower_is_better(self) -> bool {
        !matches!(self, Metric::NumbersPerSecond)
    }

    fn value(self, metrics: &RunMetrics) -> f64 {
        match self {
            Metric::Attempts => metrics.attempts as f64,
            Metric::Time => metrics.elapsed_seconds,
            Metric::NumbersPerSecond => metrics.numbers_per_second,
            Metric::CpuUsage => metrics.cpu_percent,
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Signed improvement of the current run over the best one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Variation {
    Percent(f64),
    NotAvailable,
}

impl Variation {
    /// Percentage change oriented so that positive means better.
    pub fn between(current: f64, best: f64, lower_is_better: bool) -> Self {
        if best == 0.0 {
            return Variation::NotAvailable;
        }
        let delta = if lower_is_better {
            best - current
        } else {
            current - best
        };
        let percent = delta / best * 100.0;
        if percent.is_finite() {
            Variation::Percent(percent)
        } else {
            Variation::NotAvailable
        }
    }

    pub fn percent(self) -> Option<f64> {
        match self {
            Variation::Percent(p) => Some(p),
            Variation::NotAvailable => None,
        }
    }
}

/// One line of the results table.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub metric: Metric,
    pub current: f64,
    pub best: Option<f64>,
    pub variation: Variation,
}

/// Compares `current` against `best`, one row per [`Metric`].
pub fn compare(current: &RunMetrics, best: Option<&HistoryRecord>) -> Vec<ComparisonRow> {
    Metric::ALL
        .iter()
        .map(|&metric| {
            let now = metric.value(current);
            let previous = best.map(|r| metric.value(&r.metrics));
            let variation = match previous {
                Some(prev) => Variation::between(now, prev, metric.lower_is_better()),
                None => Variation::NotAvailable,
            };
            ComparisonRow {
                metric,
                current: now,
                best: previous,
                variation,
            }
        })
        .collect()
}

/// Milliseconds per attempt for the current run and the best on record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioSummary {
    pub current_ms: Option<f64>,
    /// Minimum over every record with the same digit count, current run included.
    pub best_ms: Option<f64>,
}

impl RatioSummary {
    pub fn new(current: &RunMetrics, records: &[HistoryRecord]) -> Self {
        let current_ms = current.ms_per_attempt();
        let best_ms = records
            .iter()
            .filter(|r| r.digit_count() == current.digit_count)
            .filter_map(|r| r.metrics.ms_per_attempt())
            .chain(current_ms)
            .min_by(f64::total_cmp);
        Self {
            current_ms,
            best_ms,
        }
    }
}
