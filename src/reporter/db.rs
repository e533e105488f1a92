//! File reporter: one timestamped JSON document per flush.
//!
//! Files are named `{prefix}_{YYYYMMDD_HHMMSS}.json` (UTC). Two flushes in the
//! same second get a `_000001`, `_000002`... suffix, which keeps lexicographic
//! order chronological for up to 999999 extra flushes per second. Writes go to a hidden temporary file first and are renamed
//! into place, so a reader never sees a partial document.

use crate::core::labels::Labels;
use crate::core::time::nanos_to_datetime;
use crate::core::{DbConfig, Result, TelemetryError, TestContext};
use crate::metrics::MetricType;
use crate::reporter::{Batch, RecordValue, Reporter, ReporterCore, ReporterType};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const FILE_EXTENSION: &str = ".json";
const SUFFIX_WIDTH: usize = 6;

/// Persisted form of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbReport {
    pub metadata: DbMetadata,
    pub measurements: Vec<DbMeasurement>,
}

/// Batch-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbMetadata {
    pub reporter_type: ReporterType,
    /// Batch timestamp, RFC 3339
    pub timestamp: String,
    pub test_context: Labels,
    pub measurement_count: usize,
}

/// One persisted measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbMeasurement {
    pub metric_name: String,
    pub metric_type: MetricType,
    pub description: String,
    pub unit: String,
    pub value: RecordValue,
    pub labels: Labels,
    /// Nanoseconds since Unix epoch
    pub timestamp: u64,
    pub timestamp_iso: String,
}

/// Reporter persisting every batch as a JSON file.
#[derive(Debug)]
pub struct DbReporter {
    core: ReporterCore,
    output_dir: PathBuf,
    file_prefix: String,
}

impl DbReporter {
    /// Create a reporter writing into `config.output_dir`, or the working
    /// directory when unset. The directory is created if missing.
    pub fn new(config: &DbConfig, test_context: TestContext) -> Result<Self> {
        if config.file_prefix.is_empty() || config.file_prefix.contains(|c| c == '/' || c == '\\') {
            return Err(TelemetryError::config(format!(
                "Invalid file prefix '{}'",
                config.file_prefix
            )));
        }

        let output_dir = match &config.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        fs::create_dir_all(&output_dir)
            .map_err(|e| TelemetryError::persistence(&output_dir, e))?;

        info!(
            "Created db reporter writing {}_*.json to {}",
            config.file_prefix,
            output_dir.display()
        );

        Ok(Self {
            core: ReporterCore::new(ReporterType::Db, test_context),
            output_dir,
            file_prefix: config.file_prefix.clone(),
        })
    }

    /// Directory receiving batch files
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Filename prefix of batch files
    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    /// Batch files written with this reporter's prefix, oldest first.
    pub fn get_output_files(&self) -> Result<Vec<PathBuf>> {
        list_batch_files(&self.output_dir, &self.file_prefix)
    }

    /// Delete every batch file with this reporter's prefix.
    ///
    /// Returns the number of files removed. Files that cannot be removed are
    /// logged and skipped.
    pub fn clear_output_files(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.get_output_files()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        debug!("Removed {} batch files from {}", removed, self.output_dir.display());
        Ok(removed)
    }

    /// Read back a persisted batch file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<DbReport> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| TelemetryError::persistence(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persisted form of `batch`
    pub fn build_report(&self, batch: &Batch) -> DbReport {
        let timestamp_iso = batch.datetime().to_rfc3339_opts(SecondsFormat::Micros, true);

        let measurements = batch
            .records
            .iter()
            .map(|record| DbMeasurement {
                metric_name: record.metric.name.clone(),
                metric_type: record.metric.metric_type,
                description: record.metric.description.clone(),
                unit: record.metric.unit.clone(),
                value: record.value.clone(),
                labels: record.labels.clone(),
                timestamp: batch.timestamp_ns,
                timestamp_iso: timestamp_iso.clone(),
            })
            .collect();

        DbReport {
            metadata: DbMetadata {
                reporter_type: ReporterType::Db,
                timestamp: timestamp_iso,
                test_context: self.core.test_context().labels().clone(),
                measurement_count: batch.len(),
            },
            measurements,
        }
    }

    /// First free file path for a batch taken at `timestamp_ns`
    fn next_file_path(&self, timestamp_ns: u64) -> PathBuf {
        let stamp = nanos_to_datetime(timestamp_ns).format("%Y%m%d_%H%M%S");
        let base = format!("{}_{}", self.file_prefix, stamp);

        let mut path = self.output_dir.join(format!("{}{}", base, FILE_EXTENSION));
        let mut suffix = 1u32;
        while path.exists() {
            path = self
                .output_dir
                .join(format!("{}_{:0width$}{}", base, suffix, FILE_EXTENSION, width = SUFFIX_WIDTH));
            suffix += 1;
        }
        path
    }
}

impl Reporter for DbReporter {
    fn core(&self) -> &ReporterCore {
        &self.core
    }

    fn flush(&self, batch: &Batch) -> Result<()> {
        let report = self.build_report(batch);
        let content = serde_json::to_vec_pretty(&report)?;
        let path = self.next_file_path(batch.timestamp_ns);

        if let Err(e) = write_atomically(&path, &content) {
            error!(
                "Lost {} measurements, failed to write {}: {}",
                batch.len(),
                path.display(),
                e
            );
            return Err(TelemetryError::persistence(path, e));
        }

        info!("Wrote {} measurements to {}", batch.len(), path.display());
        Ok(())
    }
}

fn write_atomically(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result = write_and_sync(&tmp_path, content).and_then(|()| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_and_sync(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// Batch files written under `prefix` in `dir`, sorted by name.
///
/// Only names of the exact shape `{prefix}_YYYYMMDD_HHMMSS[_NNNNNN].json`
/// match, so a reporter never claims the files of a longer prefix.
pub fn list_batch_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if is_batch_file_name(&name.to_string_lossy(), prefix) && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

fn is_batch_file_name(name: &str, prefix: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
    else {
        return false;
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let mut parts = rest.split('_');
    let date = parts.next().unwrap_or_default();
    let time = parts.next().unwrap_or_default();
    let suffix = parts.next();

    date.len() == 8
        && all_digits(date)
        && time.len() == 6
        && all_digits(time)
        && suffix.map_or(true, |s| s.len() == SUFFIX_WIDTH && all_digits(s))
        && parts.next().is_none()
}
