//! The hourly export run.
//!
//! [`Exporter::run`] performs, in order:
//!
//! 1. return early if the hour's tracking marker exists,
//! 2. index the source files of the hour,
//! 3. parse them on the deserialize pool,
//! 4. write the partitioned dataset on the write pool,
//! 5. write the tracking marker, only if every partition was written.
//!
//! Each early exit is a distinct [`ExportOutcome`]; failures are [`ExportError`]s.

use crate::config::{ExportConfig, Hour};
use crate::dataset::{DatasetLayout, DatasetWriter};
use crate::deserialize::deserialize_files;
use crate::error::ExportError;
use crate::index::FileIndex;
use crate::io::storage::Storage;
use crate::relay::RelayHandle;
use crate::runner::WorkerPool;
use crate::tracking::Tracker;
use std::sync::Arc;

const ORIGIN: &str = "export";

/// Counts from a completed export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    /// Source files indexed for the hour.
    pub files: usize,
    /// Source files dropped because they failed to parse.
    pub failed_files: usize,
    pub records: usize,
    pub partitions: usize,
}

impl ExportSummary {
    /// Human-readable text stored in the tracking marker.
    #[must_use]
    pub fn note(&self, hour: Hour) -> String {
        format!(
            "exported {} record(s) from {} of {} file(s) into {} partition(s) for hour {hour}\n",
            self.records,
            self.files - self.failed_files,
            self.files,
            self.partitions
        )
    }
}

/// How a successful run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The hour's marker already existed; nothing was read.
    AlreadyTracked,
    /// No source file matched the hour.
    NoSourceFiles,
    /// Files were found but none yielded a record.
    NoRecords,
    Exported(ExportSummary),
}

/// Runs one hour's export against a source and a destination store.
pub struct Exporter {
    config: ExportConfig,
    source: Arc<dyn Storage>,
    destination: Arc<dyn Storage>,
    tracking: Option<Arc<dyn Storage>>,
    layout: DatasetLayout,
    relay: RelayHandle,
}

impl Exporter {
    /// Validate `config` and build an exporter with the default layout.
    ///
    /// Markers are stored through `destination` unless
    /// [`with_tracking_storage`](Self::with_tracking_storage) says otherwise.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any storage is touched.
    pub fn new(
        config: ExportConfig,
        source: Arc<dyn Storage>,
        destination: Arc<dyn Storage>,
        relay: RelayHandle,
    ) -> Result<Self, ExportError> {
        let config = config.validate()?;
        let layout = DatasetLayout::default();
        layout.data_indices()?;
        Ok(Self {
            config,
            source,
            destination,
            tracking: None,
            layout,
            relay,
        })
    }

    /// Replace the dataset layout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the layout does not fit the record schema.
    pub fn with_layout(mut self, layout: DatasetLayout) -> Result<Self, ExportError> {
        layout.data_indices()?;
        self.layout = layout;
        Ok(self)
    }

    #[must_use]
    pub fn with_tracking_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.tracking = Some(storage);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn tracker(&self) -> Option<Tracker> {
        let root = self.config.tracking_root.as_ref()?;
        let storage = self
            .tracking
            .as_ref()
            .unwrap_or(&self.destination);
        Some(Tracker::new(Arc::clone(storage), root.clone()))
    }

    /// Export the configured hour.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::StageTimeout`] if either stage overruns,
    /// [`ExportError::PartitionWrites`] if any partition failed, and
    /// [`ExportError::Other`] for storage failures outside the worker jobs. The
    /// marker is not written in any of these cases.
    pub fn run(&self) -> Result<ExportOutcome, ExportError> {
        let hour = self.config.hour;
        let tracker = self.tracker();

        if let Some(tracker) = &tracker
            && tracker.is_tracked(hour)?
        {
            self.relay.info(ORIGIN, format!("hour {hour} already exported"));
            return Ok(ExportOutcome::AlreadyTracked);
        }

        let pattern = self.config.source_pattern();
        let index = FileIndex::build(self.source.as_ref(), &pattern, &self.relay)?;
        if index.is_empty() {
            self.relay.info(ORIGIN, format!("no source files match {pattern}"));
            return Ok(ExportOutcome::NoSourceFiles);
        }
        self.relay.info(ORIGIN, format!("hour {hour}: {} source file(s)", index.len()));

        let parsed = {
            let pool = WorkerPool::new(
                "deserialize",
                self.config.parallelism.deserialize_workers,
                &self.relay,
            )?;
            deserialize_files(&index, &self.source, &pool, self.config.timeout, &self.relay)?
        };
        if parsed.records.is_empty() {
            self.relay.info(ORIGIN, format!("hour {hour}: no records to write"));
            return Ok(ExportOutcome::NoRecords);
        }
        let records = parsed.records.len();

        let root = &self.config.destination_root;
        if self.destination.is_local() {
            self.destination.create_dir_all(root)?;
        }
        let writer = DatasetWriter::new(
            Arc::clone(&self.destination),
            root.clone(),
            self.layout.clone(),
            self.relay.clone(),
        )?;
        let written = {
            let pool =
                WorkerPool::new("write", self.config.parallelism.write_workers, &self.relay)?;
            writer.write(parsed.records, &pool, self.config.timeout)?
        };
        if !written.is_complete() {
            return Err(ExportError::PartitionWrites {
                failed: written.failed.len(),
                total: written.partitions(),
            });
        }

        let summary = ExportSummary {
            files: index.len(),
            failed_files: parsed.failed.len(),
            records,
            partitions: written.written.len(),
        };
        if let Some(tracker) = tracker {
            tracker.mark(hour, &summary.note(hour))?;
        }
        self.relay.info(ORIGIN, summary.note(hour).trim_end().to_string());
        Ok(ExportOutcome::Exported(summary))
    }
}
