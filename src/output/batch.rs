//! Partitioned batch materialization

use super::writer::{write_records, FormatOptions};
use crate::config::StorageConfig;
use crate::error::{Error, Result, StorageError};
use crate::partition::{plan, PartitionPath};
use crate::record::WeatherRecord;
use crate::types::{OutputFormat, PartitionLayout, RunTimestamp, SegmentStyle, UnitSystem};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of writing one partition group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionWrite {
    /// Relative partition in the writer's segment style (`2026/02/07/GB/weather_<ts>`)
    pub partition: String,
    /// Target file
    pub path: PathBuf,
    /// Records in the group
    pub records: usize,
    /// Set when the group could not be written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StorageError>,
}

impl PartitionWrite {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-partition results of one write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub format: OutputFormat,
    pub layout: PartitionLayout,
    pub base_path: PathBuf,
    /// One entry per partition group, ordered by path
    pub partitions: Vec<PartitionWrite>,
}

impl WriteReport {
    /// Empty report for a destination
    pub fn empty(format: OutputFormat, layout: PartitionLayout, base_path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            layout,
            base_path: base_path.into(),
            partitions: Vec::new(),
        }
    }

    /// Records that reached disk
    pub fn records_written(&self) -> usize {
        self.partitions
            .iter()
            .filter(|p| p.is_success())
            .map(|p| p.records)
            .sum()
    }

    /// Files that were written
    pub fn files_written(&self) -> usize {
        self.partitions.iter().filter(|p| p.is_success()).count()
    }

    /// Groups that failed
    pub fn failed(&self) -> impl Iterator<Item = &PartitionWrite> {
        self.partitions.iter().filter(|p| !p.is_success())
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Groups a run's records by partition and writes one file per group
#[derive(Debug, Clone)]
pub struct BatchWriter {
    format: OutputFormat,
    layout: PartitionLayout,
    base_path: PathBuf,
    segment_style: SegmentStyle,
    concurrency: usize,
    options: FormatOptions,
}

impl BatchWriter {
    /// Create a writer for the given destination and unit system
    pub fn new(storage: &StorageConfig, units: UnitSystem) -> Self {
        let mut options = FormatOptions::new(units);
        options.csv_null.clone_from(&storage.csv_null);

        Self {
            format: storage.format,
            layout: storage.layout,
            base_path: storage.base_path.clone(),
            segment_style: storage.segment_style,
            concurrency: storage.write_concurrency.max(1),
            options,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Group records by their partition path
    pub fn group(
        &self,
        records: &[WeatherRecord],
        run_ts: &RunTimestamp,
    ) -> BTreeMap<PartitionPath, Vec<WeatherRecord>> {
        let mut groups: BTreeMap<PartitionPath, Vec<WeatherRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry(plan(record, self.layout, run_ts))
                .or_default()
                .push(record.clone());
        }
        groups
    }

    /// Create the base directory and check that files can be created in it
    ///
    /// Failure here means the whole destination is unusable.
    pub fn prepare_destination(&self, run_ts: &RunTimestamp) -> Result<()> {
        let base = self.base_path.display().to_string();

        fs::create_dir_all(&self.base_path).map_err(|e| Error::unwritable(&base, e.to_string()))?;

        let probe = self.base_path.join(format!(".probe_{run_ts}"));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)
            .map_err(|e| Error::unwritable(&base, e.to_string()))?;
        fs::remove_file(&probe).map_err(|e| Error::unwritable(&base, e.to_string()))?;

        Ok(())
    }

    /// Write every partition group of a run
    ///
    /// Only an unusable destination is an error. A group that fails is
    /// recorded in the report and does not stop the others.
    pub async fn write(&self, records: &[WeatherRecord], run_ts: &RunTimestamp) -> Result<WriteReport> {
        self.prepare_destination(run_ts)?;

        let groups = self.group(records, run_ts);
        info!(
            records = records.len(),
            partitions = groups.len(),
            format = %self.format,
            layout = %self.layout,
            "Writing batch"
        );

        let mut partitions: Vec<PartitionWrite> = stream::iter(groups)
            .map(|(partition, rows)| self.write_group(partition, rows))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        partitions.sort_by(|a, b| a.path.cmp(&b.path));

        let mut report = WriteReport::empty(self.format, self.layout, &self.base_path);
        report.partitions = partitions;
        Ok(report)
    }

    async fn write_group(&self, partition: PartitionPath, rows: Vec<WeatherRecord>) -> PartitionWrite {
        let path = partition.to_path(&self.base_path, self.format, self.segment_style);
        let records = rows.len();
        let format = self.format;
        let options = self.options.clone();
        let target = path.clone();

        let result = tokio::task::spawn_blocking(move || write_file(&target, format, &rows, &options))
            .await
            .unwrap_or_else(|e| Err(StorageError::new(path.display().to_string(), e)));

        match &result {
            Ok(()) => debug!(path = %path.display(), records, "Partition written"),
            Err(e) => warn!(path = %path.display(), records, error = %e.message, "Partition failed"),
        }

        PartitionWrite {
            partition: partition.render(self.segment_style),
            path,
            records,
            error: result.err(),
        }
    }
}

fn write_file(
    path: &Path,
    format: OutputFormat,
    rows: &[WeatherRecord],
    options: &FormatOptions,
) -> std::result::Result<(), StorageError> {
    let storage_error = |e: &dyn std::fmt::Display| StorageError::new(path.display().to_string(), e);

    if let Some(mismatch) = rows.iter().find(|r| r.units != options.units) {
        return Err(storage_error(&format!(
            "record for {} uses {} units, run uses {}",
            mismatch.city_id(),
            mismatch.units,
            options.units
        )));
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| storage_error(&e))?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| storage_error(&e))?;

    if let Err(e) = write_records(file, format, rows, options) {
        // the file exists only because of this attempt
        let _ = fs::remove_file(path);
        return Err(storage_error(&e));
    }
    Ok(())
}
