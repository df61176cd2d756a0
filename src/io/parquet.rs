//! Parquet encoding for partition files.
//!
//! [`write_row_groups`] writes each batch as exactly one row group by flushing
//! the `ArrowWriter` after every batch. All files use Snappy compression.
//! [`row_group_row_counts`] and [`read_batches`] read files back for inspection.

use anyhow::{Context, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Rows above which the writer splits a single batch into several row groups.
pub const MAX_ROW_GROUP_ROWS: usize = 64 * 1024 * 1024;

/// Writer settings shared by every partition file.
#[must_use]
pub fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_max_row_group_size(MAX_ROW_GROUP_ROWS)
        .build()
}

/// Encode `batches` into `sink`, one row group per batch, and return the sink
/// together with the number of row groups written.
///
/// Every batch must carry `schema`.
///
/// # Errors
///
/// Returns an error if a batch does not match the schema or encoding fails.
pub fn write_row_groups<W, I>(sink: W, schema: SchemaRef, batches: I) -> Result<(W, usize)>
where
    W: Write + Send,
    I: IntoIterator<Item = Result<RecordBatch>>,
{
    let mut writer = ArrowWriter::try_new(sink, schema, Some(writer_properties()))
        .context("create ArrowWriter")?;
    let mut groups = 0usize;
    for batch in batches {
        let batch = batch?;
        writer.write(&batch).context("write row group")?;
        writer.flush().context("close row group")?;
        groups += 1;
    }
    let sink = writer.into_inner().context("finish parquet file")?;
    Ok((sink, groups))
}

/// Row count of each row group in a local Parquet file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or metadata cannot be read.
pub fn row_group_row_counts(path: impl AsRef<Path>) -> Result<Vec<i64>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(f).context("open SerializedFileReader")?;
    let meta = reader.metadata();
    Ok((0..meta.num_row_groups())
        .map(|i| meta.row_group(i).num_rows())
        .collect())
}

/// Read every batch of a local Parquet file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn read_batches(path: impl AsRef<Path>) -> Result<Vec<RecordBatch>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("open ParquetRecordBatchReader")?
        .build()
        .context("build ParquetRecordBatchReader")?;
    reader
        .map(|batch| batch.context("read batch"))
        .collect()
}
