//! Partitioned, row-grouped Parquet dataset writer.
//!
//! Records are grouped by their partition key. Each partition becomes one file at
//! `root/col=value/.../<file name>`, written by one job on the write pool. Inside a
//! file, records are grouped again by row-group key and each group is written as
//! one row group. Partition columns are encoded in the path and left out of the
//! file schema.

use crate::error::ExportError;
use crate::io::parquet::write_row_groups;
use crate::io::storage::{Storage, join_location};
use crate::record::{
    COLUMNS, NormalizedRecord, PARTITION_COLUMNS, ROW_GROUP_COLUMNS, column_index, schema_fields,
};
use crate::relay::RelayHandle;
use crate::runner::WorkerPool;
use crate::signal::{CompletionSignal, DoneGuard};
use anyhow::{Context, Result};
use arrow::datatypes::{Schema, SchemaRef};
use crossbeam_channel::unbounded;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const ORIGIN: &str = "write";

/// Maps partition values, in partition column order, to a file name.
pub type FileNamer = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

/// Values of the partition columns for one record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey(pub Vec<String>);

/// Values of the row-group columns for one record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowGroupKey(pub Vec<String>);

/// Which columns drive the directory layout and row-group boundaries.
#[derive(Clone)]
pub struct DatasetLayout {
    pub partition_columns: Vec<String>,
    pub row_group_columns: Vec<String>,
    pub file_name: FileNamer,
}

impl DatasetLayout {
    /// A layout over the given columns with the default file name.
    #[must_use]
    pub fn new(partition_columns: &[&str], row_group_columns: &[&str]) -> Self {
        Self {
            partition_columns: partition_columns.iter().map(ToString::to_string).collect(),
            row_group_columns: row_group_columns.iter().map(ToString::to_string).collect(),
            file_name: Arc::new(default_file_name),
        }
    }

    #[must_use]
    pub fn with_file_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        self.file_name = Arc::new(f);
        self
    }

    /// Schema positions of the columns written into each file.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::UnknownColumn`] for a column outside the schema, or
    /// [`ExportError::NoDataColumns`] if the partition columns cover every column.
    pub fn data_indices(&self) -> Result<Vec<usize>, ExportError> {
        let mut partition = HashSet::new();
        for column in &self.partition_columns {
            partition.insert(
                column_index(column).ok_or_else(|| ExportError::UnknownColumn(column.clone()))?,
            );
        }
        if let Some(unknown) = self
            .row_group_columns
            .iter()
            .find(|c| column_index(c).is_none())
        {
            return Err(ExportError::UnknownColumn(unknown.clone()));
        }
        let data: Vec<usize> = (0..COLUMNS.len())
            .filter(|i| !partition.contains(i))
            .collect();
        if data.is_empty() {
            return Err(ExportError::NoDataColumns);
        }
        Ok(data)
    }

    /// Destination of the file holding `key`.
    #[must_use]
    pub fn partition_location(&self, root: &str, key: &PartitionKey) -> String {
        let mut location = root.trim_end_matches('/').to_string();
        for (column, value) in self.partition_columns.iter().zip(&key.0) {
            location = join_location(&location, &format!("{column}={value}"));
        }
        join_location(&location, &(self.file_name)(key.0.as_slice()))
    }
}

impl Default for DatasetLayout {
    /// Partition by bucket, operation and hour; row-group by requester identity.
    fn default() -> Self {
        Self::new(&PARTITION_COLUMNS, &ROW_GROUP_COLUMNS)
    }
}

impl fmt::Debug for DatasetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetLayout")
            .field("partition_columns", &self.partition_columns)
            .field("row_group_columns", &self.row_group_columns)
            .finish_non_exhaustive()
    }
}

/// Partition values joined by `-`, plus `.parquet`.
#[must_use]
pub fn default_file_name(values: &[String]) -> String {
    format!("{}.parquet", values.join("-"))
}

fn key_of(record: &NormalizedRecord, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| record.column_value(c).unwrap_or_default())
        .collect()
}

/// Group records by partition key, in key order.
#[must_use]
pub fn group_by_partition(
    records: Vec<NormalizedRecord>,
    columns: &[String],
) -> BTreeMap<PartitionKey, Vec<NormalizedRecord>> {
    let mut groups: BTreeMap<_, Vec<_>> = BTreeMap::new();
    for record in records {
        groups
            .entry(PartitionKey(key_of(&record, columns)))
            .or_default()
            .push(record);
    }
    groups
}

/// Group records by row-group key, in key order.
#[must_use]
pub fn group_by_row_group(
    records: Vec<NormalizedRecord>,
    columns: &[String],
) -> BTreeMap<RowGroupKey, Vec<NormalizedRecord>> {
    let mut groups: BTreeMap<_, Vec<_>> = BTreeMap::new();
    for record in records {
        groups
            .entry(RowGroupKey(key_of(&record, columns)))
            .or_default()
            .push(record);
    }
    groups
}

/// A partition file that was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionWrite {
    pub location: String,
    pub rows: usize,
    pub row_groups: usize,
}

/// A partition file that was not written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionFailure {
    pub location: String,
    pub error: String,
}

/// Outcome of one [`DatasetWriter::write`] call, sorted by location.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PartitionWrite>,
    pub failed: Vec<PartitionFailure>,
}

impl WriteReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn partitions(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

/// Writes record sets as a partitioned dataset under one root.
pub struct DatasetWriter {
    storage: Arc<dyn Storage>,
    root: String,
    layout: DatasetLayout,
    data_indices: Arc<[usize]>,
    relay: RelayHandle,
}

impl DatasetWriter {
    /// # Errors
    ///
    /// Returns a configuration error if `layout` does not fit the record schema.
    pub fn new(
        storage: Arc<dyn Storage>,
        root: impl Into<String>,
        layout: DatasetLayout,
        relay: RelayHandle,
    ) -> Result<Self, ExportError> {
        let data_indices = layout.data_indices()?.into();
        Ok(Self {
            storage,
            root: root.into(),
            layout,
            data_indices,
            relay,
        })
    }

    /// Write every partition of `records` on `pool`, waiting at most `timeout`.
    ///
    /// A failing partition is logged, its partial output is removed, and it is
    /// listed in [`WriteReport::failed`]. Other partitions still complete.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::StageTimeout`] if the jobs do not all finish in time.
    pub fn write(
        &self,
        records: Vec<NormalizedRecord>,
        pool: &WorkerPool,
        timeout: Duration,
    ) -> Result<WriteReport, ExportError> {
        let signal = Arc::new(CompletionSignal::new());
        let (tx, rx) = unbounded();
        let row_group_columns: Arc<[String]> = self.layout.row_group_columns.clone().into();
        let mut locations = Vec::new();

        for (key, group) in group_by_partition(records, &self.layout.partition_columns) {
            let location = self.layout.partition_location(&self.root, &key);
            locations.push(location.clone());

            signal.add(1);
            let guard = DoneGuard::new(Arc::clone(&signal));
            let storage = Arc::clone(&self.storage);
            let row_group_columns = Arc::clone(&row_group_columns);
            let data_indices = Arc::clone(&self.data_indices);
            let relay = self.relay.clone();
            let tx = tx.clone();
            pool.spawn(move || {
                let outcome = write_partition(
                    storage.as_ref(),
                    &location,
                    group,
                    &row_group_columns,
                    &data_indices,
                )
                .map_err(|e| {
                    let error = format!("{e:#}");
                    relay.error(ORIGIN, format!("failed to write {location}: {error}"));
                    if let Err(cleanup) = storage.delete(&location) {
                        relay.warn(ORIGIN, format!("could not remove {location}: {cleanup:#}"));
                    }
                    PartitionFailure {
                        location: location.clone(),
                        error,
                    }
                });
                let _ = tx.send(outcome);
                drop(guard);
            });
        }
        drop(tx);

        signal
            .wait(timeout)
            .map_err(|source| ExportError::StageTimeout {
                stage: ORIGIN,
                source,
            })?;

        let mut report = WriteReport::default();
        for outcome in rx.try_iter() {
            match outcome {
                Ok(written) => {
                    self.relay.debug(
                        ORIGIN,
                        format!(
                            "{}: {} row(s) in {} row group(s)",
                            written.location, written.rows, written.row_groups
                        ),
                    );
                    report.written.push(written);
                }
                Err(failure) => report.failed.push(failure),
            }
        }

        let reported: HashSet<&str> = report
            .written
            .iter()
            .map(|w| w.location.as_str())
            .chain(report.failed.iter().map(|f| f.location.as_str()))
            .collect();
        let lost: Vec<String> = locations
            .into_iter()
            .filter(|l| !reported.contains(l.as_str()))
            .collect();
        for location in lost {
            self.relay
                .error(ORIGIN, format!("failed to write {location}: worker panicked"));
            if let Err(cleanup) = self.storage.delete(&location) {
                self.relay
                    .warn(ORIGIN, format!("could not remove {location}: {cleanup:#}"));
            }
            report.failed.push(PartitionFailure {
                location,
                error: "worker panicked".into(),
            });
        }

        report.written.sort_by(|a, b| a.location.cmp(&b.location));
        report.failed.sort_by(|a, b| a.location.cmp(&b.location));
        self.relay.info(
            ORIGIN,
            format!(
                "wrote {} of {} partition(s) under {}",
                report.written.len(),
                report.partitions(),
                self.root
            ),
        );
        Ok(report)
    }
}

/// Encode one partition group into a single file.
fn write_partition(
    storage: &dyn Storage,
    location: &str,
    records: Vec<NormalizedRecord>,
    row_group_columns: &[String],
    data_indices: &[usize],
) -> Result<PartitionWrite> {
    if storage.is_local()
        && let Some((parent, _)) = location.rsplit_once('/')
        && !parent.is_empty()
    {
        storage.create_dir_all(parent)?;
    }

    let fields = schema_fields();
    let schema: SchemaRef = Arc::new(
        Schema::new(fields.clone())
            .project(data_indices)
            .context("project file schema")?,
    );
    let rows = records.len();
    let batches = group_by_row_group(records, row_group_columns)
        .into_values()
        .map(|group| {
            let batch = serde_arrow::to_record_batch(&fields, &group)
                .context("convert records to arrow")?;
            batch
                .project(data_indices)
                .context("drop partition columns")
        });

    let sink = storage.create(location)?;
    let (sink, row_groups) = write_row_groups(sink, schema, batches)?;
    sink.commit()?;
    Ok(PartitionWrite {
        location: location.to_string(),
        rows,
        row_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_record;

    #[test]
    fn default_layout_paths() {
        let layout = DatasetLayout::default();
        let key = PartitionKey(
            ["mybucket", "REST.GET.OBJECT", "2019", "2", "7", "0"]
                .map(String::from)
                .to_vec(),
        );
        assert_eq!(
            layout.partition_location("/out/", &key),
            "/out/bucket_name=mybucket/operation=REST.GET.OBJECT/year=2019/month=2/day=7/hour=0/mybucket-REST.GET.OBJECT-2019-2-7-0.parquet"
        );
    }

    #[test]
    fn layout_rejects_unknown_columns() {
        let layout = DatasetLayout::new(&["bucket_name", "nope"], &[]);
        assert!(matches!(layout.data_indices(), Err(ExportError::UnknownColumn(c)) if c == "nope"));

        let layout = DatasetLayout::new(&["bucket_name"], &["missing"]);
        assert!(
            matches!(layout.data_indices(), Err(ExportError::UnknownColumn(c)) if c == "missing")
        );
    }

    #[test]
    fn layout_needs_a_data_column() {
        let layout = DatasetLayout::new(&COLUMNS, &[]);
        assert!(matches!(layout.data_indices(), Err(ExportError::NoDataColumns)));

        let data = DatasetLayout::default().data_indices().unwrap();
        assert_eq!(data.len(), COLUMNS.len() - PARTITION_COLUMNS.len());
    }

    #[test]
    fn grouping_is_by_rendered_value() {
        let a = sample_record();
        let mut b = sample_record();
        b.requester = "someone-else".into();
        let mut c = sample_record();
        c.operation = "REST.PUT.OBJECT".into();

        let layout = DatasetLayout::default();
        let parts = group_by_partition(vec![a, b, c], &layout.partition_columns);
        assert_eq!(parts.len(), 2);

        let get = parts.values().find(|g| g.len() == 2).unwrap().clone();
        assert_eq!(group_by_row_group(get, &layout.row_group_columns).len(), 2);
    }

    #[test]
    fn custom_file_name() {
        let layout = DatasetLayout::new(&["bucket_name"], &[])
            .with_file_name(|values| format!("part-{}.parquet", values[0]));
        let key = PartitionKey(vec!["b".into()]);
        assert_eq!(
            layout.partition_location("s3://out", &key),
            "s3://out/bucket_name=b/part-b.parquet"
        );
    }
}
