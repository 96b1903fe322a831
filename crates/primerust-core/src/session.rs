//! One benchmark run end to end: prior best, search, comparison, persistence.

use chrono::Utc;
use tracing::{info, warn};

use crate::compare::{compare, ComparisonRow, RatioSummary};
use crate::history::{HistoryRecord, HistoryStore};
use crate::search::{ProgressSink, SearchCoordinator};
use crate::system::SystemInfo;
use crate::{HistoryError, RunMetrics, SearchError, SearchRequest};

/// What to do with a history that exists but cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPolicy {
    /// Leave the file untouched and skip persistence.
    #[default]
    KeepCorrupt,
    /// Move the unreadable file aside and start a new history.
    OverwriteCorrupt,
}

/// Outcome of [`run_session`].
#[derive(Debug)]
pub struct RunReport {
    pub metrics: RunMetrics,
    /// Fastest earlier run with the same digit count.
    pub best: Option<HistoryRecord>,
    /// `None` when the history could not be read.
    pub comparison: Option<Vec<ComparisonRow>>,
    pub history_error: Option<HistoryError>,
    pub persisted: bool,
    pub ratio: RatioSummary,
}

/// Runs one search and records it.
///
/// A history failure never discards a found prime: the report carries the
/// error and `persisted == false`. Search failures propagate and nothing is
/// written.
pub fn run_session(
    request: &SearchRequest,
    coordinator: &SearchCoordinator,
    store: &mut dyn HistoryStore,
    sink: &dyn ProgressSink,
    policy: HistoryPolicy,
) -> Result<RunReport, SearchError> {
    let digits = request.digit_count();
    let (best, mut history_error) = match store.load_best(digits) {
        Ok(best) => (best, None),
        Err(e) => {
            warn!(error = %e, "history unavailable, comparison skipped");
            (None, Some(e))
        }
    };

    let metrics = coordinator.run_search(request, sink)?;
    let comparison = history_error
        .is_none()
        .then(|| compare(&metrics, best.as_ref()));

    let record = HistoryRecord::new(metrics.clone(), SystemInfo::collect(), Utc::now());
    let mut persisted = false;
    match history_error.take() {
        None => match store.append(record) {
            Ok(()) => persisted = true,
            Err(e) => history_error = Some(e),
        },
        Some(e) if e.is_corrupt() && policy == HistoryPolicy::OverwriteCorrupt => {
            match store.reset().and_then(|()| store.append(record)) {
                Ok(()) => {
                    info!(digits, "history restarted after unreadable log");
                    persisted = true;
                }
                Err(reset_err) => history_error = Some(reset_err),
            }
        }
        Some(e) => history_error = Some(e),
    }
    if let Some(e) = &history_error {
        warn!(error = %e, "run not persisted");
    }

    let records = if history_error.is_none() {
        store.records().unwrap_or_default()
    } else {
        Vec::new()
    };
    let ratio = RatioSummary::new(&metrics, &records);

    Ok(RunReport {
        metrics,
        best,
        comparison,
        history_error,
        persisted,
        ratio,
    })
}
