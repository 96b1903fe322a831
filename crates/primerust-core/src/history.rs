//! Persistent log of completed runs.
//!
//! The history is an append-only list of [`HistoryRecord`]s. The best record
//! for a digit count is the one with the smallest elapsed time.
//!
//! [`JsonHistoryStore`] keeps the list as a pretty-printed JSON array. Every
//! write replaces the whole file through a temporary file in the same
//! directory, so a crash never leaves a half-written log behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::format::{format_scientific, SCIENTIFIC_PRECISION};
use crate::system::SystemInfo;
use crate::{HistoryError, RunMetrics};

/// Default location of the JSON log, relative to the working directory.
pub const DEFAULT_HISTORY_FILE: &str = "prime_log.json";

/// Suffix given to an unreadable log when it is set aside.
pub const CORRUPT_SUFFIX: &str = "corrupt";

/// One persisted run. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub metrics: RunMetrics,
    #[serde(default)]
    pub prime_scientific: String,
    #[serde(flatten)]
    pub system: SystemInfo,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(metrics: RunMetrics, system: SystemInfo, timestamp: DateTime<Utc>) -> Self {
        let prime_scientific = format_scientific(&metrics.prime_value, SCIENTIFIC_PRECISION);
        Self {
            metrics,
            prime_scientific,
            system,
            timestamp,
        }
    }

    #[inline]
    pub fn digit_count(&self) -> u32 {
        self.metrics.digit_count
    }
}

/// Storage backend for run history.
pub trait HistoryStore {
    /// Every record, in append order.
    fn records(&self) -> Result<Vec<HistoryRecord>, HistoryError>;

    /// The fastest record for `digits`, or `None` when there is none.
    fn load_best(&self, digits: u32) -> Result<Option<HistoryRecord>, HistoryError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.digit_count() == digits)
            .min_by(|a, b| {
                a.metrics
                    .elapsed_seconds
                    .total_cmp(&b.metrics.elapsed_seconds)
            }))
    }

    fn append(&mut self, record: HistoryRecord) -> Result<(), HistoryError>;

    /// Discards the stored collection so the next append starts fresh.
    fn reset(&mut self) -> Result<(), HistoryError>;
}

/// History kept as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    /// Binds the store to `path`. Nothing is read until the first access.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`HistoryStore::reset`] moves an unreadable log.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_HISTORY_FILE.into());
        name.push(".");
        name.push(CORRUPT_SUFFIX);
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_all(&self, records: &[HistoryRecord]) -> Result<(), HistoryError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        serde_json::to_writer_pretty(&mut tmp, records).map_err(HistoryError::Encode)?;
        tmp.write_all(b"\n").map_err(|e| self.io_error(e))?;
        tmp.flush().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| HistoryError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn records(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|source| HistoryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn append(&mut self, record: HistoryRecord) -> Result<(), HistoryError> {
        let mut records = self.records()?;
        records.push(record);
        self.write_all(&records)?;
        debug!(path = %self.path.display(), total = records.len(), "history record appended");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), HistoryError> {
        let backup = self.backup_path();
        match fs::rename(&self.path, &backup) {
            Ok(()) => {
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    "unreadable history moved aside"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Timestamps are written as RFC 3339. Logs from older releases stored
/// naive local time as `%Y-%m-%d %H:%M:%S`; those are read as local time.
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(parsed.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(text, LEGACY_FORMAT).ok()?;
        Some(match Local.from_local_datetime(&naive).earliest() {
            Some(local) => local.with_timezone(&Utc),
            // Skipped by a DST transition.
            None => naive.and_utc(),
        })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| D::Error::custom(format!("invalid timestamp `{text}`")))
    }
}

/// History held in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    records: Vec<HistoryRecord>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn records(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        Ok(self.records.clone())
    }

    fn append(&mut self, record: HistoryRecord) -> Result<(), HistoryError> {
        self.records.push(record);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), HistoryError> {
        self.records.clear();
        Ok(())
    }
}
