//! # s3access
//!
//! Converts one hour of **S3 server access logs** into a partitioned, row-grouped
//! **Parquet dataset**.
//!
//! ## Key Features
//!
//! - **Fast line parsing** - a single regex splits quoted, bracketed and plain fields
//! - **Typed records** - every line becomes a [`NormalizedRecord`] with numeric,
//!   time and identity columns derived up front
//! - **Parallel stages** - files are parsed and partitions written on bounded Rayon
//!   pools, joined through a [`CompletionSignal`] with a timeout
//! - **Hive-style layout** - `bucket_name=../operation=../year=../month=../day=../hour=..`
//!   directories, one Snappy-compressed file per partition, one row group per requester
//! - **Idempotent hours** - a tracking marker makes re-running a finished hour a no-op
//! - **Pluggable storage** - local paths through [`LocalStorage`], object stores
//!   through [`ObjectStorage`] over any [`ObjectIO`](io::cloud::ObjectIO) client
//!
//! ## Quick Start
//!
//! ```no_run
//! use s3access::*;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ExportConfig {
//!     source_root: "/var/log/s3".into(),
//!     destination_root: "/data/s3access".into(),
//!     tracking_root: Some("/data/s3access-tracking".into()),
//!     hour: "2019-02-07-00".parse()?,
//!     ..ExportConfig::default()
//! };
//!
//! let relay = LogRelay::spawn(relay::DEFAULT_CAPACITY)?;
//! let exporter = Exporter::new(
//!     config,
//!     Arc::new(LocalStorage),
//!     Arc::new(LocalStorage),
//!     relay.handle(),
//! )?;
//! let outcome = exporter.run()?;
//! relay.shutdown();
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Parsing
//!
//! [`parse::tokenize`] splits a line and [`parse::normalize`] maps the tokens onto a
//! [`NormalizedRecord`]. A malformed line fails its whole file; other files are
//! unaffected.
//!
//! ### Stages
//!
//! - [`deserialize::deserialize_files`] - one job per source file
//! - [`DatasetWriter::write`] - one job per partition
//!
//! Both register each job with a [`CompletionSignal`] before dispatch and wait on
//! it with the configured timeout. Results are merged by the waiting thread.
//!
//! ### Logging
//!
//! Workers log through a [`RelayHandle`]. A single [`LogRelay`] thread forwards
//! the lines to `tracing`, so concurrent output never interleaves.
//!
//! ### Orchestration
//!
//! [`Exporter::run`] checks the hour's marker, indexes, parses, writes and finally
//! marks the hour. See [`ExportOutcome`] for the early exits.

pub mod config;
pub mod dataset;
pub mod deserialize;
pub mod error;
pub mod export;
pub mod index;
pub mod io;
pub mod parse;
pub mod record;
pub mod relay;
pub mod runner;
pub mod signal;
pub mod testing;
pub mod tracking;

pub use config::{ExportConfig, Hour, StorageOptions};
pub use dataset::{DatasetLayout, DatasetWriter, PartitionKey, RowGroupKey, WriteReport};
pub use deserialize::DeserializeReport;
pub use error::{ExportError, ParseError, SignalError};
pub use export::{ExportOutcome, ExportSummary, Exporter};
pub use index::{FileIndex, FileIndexEntry};
pub use io::storage::{LocalStorage, ObjectStorage, Storage};
pub use record::NormalizedRecord;
pub use relay::{Level, LogLine, LogRelay, RelayHandle};
pub use runner::{Parallelism, WorkerPool};
pub use signal::{CompletionSignal, DoneGuard};
pub use tracking::Tracker;
