//! Parallel deserialization of raw log files.
//!
//! Every indexed file becomes one job on the deserialize pool. A job reads the
//! whole file and parses every line; the first malformed line drops that file.
//! Outcomes travel back over a channel and are merged here after the
//! [`CompletionSignal`] reaches zero, so no job ever touches the merged result.

use crate::error::ExportError;
use crate::index::FileIndex;
use crate::io::storage::Storage;
use crate::parse::parse_lines;
use crate::record::NormalizedRecord;
use crate::relay::RelayHandle;
use crate::runner::WorkerPool;
use crate::signal::{CompletionSignal, DoneGuard};
use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const ORIGIN: &str = "deserialize";

/// A file that was dropped from the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileFailure {
    pub location: String,
    pub error: String,
}

/// Result of the deserialization stage.
#[derive(Debug, Default)]
pub struct DeserializeReport {
    /// Records from every file that parsed cleanly, in no particular order.
    pub records: Vec<NormalizedRecord>,
    pub files_ok: usize,
    pub failed: Vec<FileFailure>,
}

/// Read and parse one file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any line is malformed.
pub fn read_file(storage: &dyn Storage, location: &str) -> Result<Vec<NormalizedRecord>> {
    let reader = storage.open_read(location)?;
    parse_lines(reader).with_context(|| format!("parse {location}"))
}

/// Parse every file in `index` on `pool`, waiting at most `timeout`.
///
/// A failing file is logged once, naming the file, and reported in
/// [`DeserializeReport::failed`]; the remaining files are unaffected.
///
/// # Errors
///
/// Returns [`ExportError::StageTimeout`] if the jobs do not all finish in time.
pub fn deserialize_files(
    index: &FileIndex,
    storage: &Arc<dyn Storage>,
    pool: &WorkerPool,
    timeout: Duration,
    relay: &RelayHandle,
) -> Result<DeserializeReport, ExportError> {
    let signal = Arc::new(CompletionSignal::new());
    let (tx, rx) = unbounded();

    for entry in index.iter() {
        signal.add(1);
        let guard = DoneGuard::new(Arc::clone(&signal));
        let storage = Arc::clone(storage);
        let relay = relay.clone();
        let tx = tx.clone();
        let location = entry.location.clone();
        pool.spawn(move || {
            let outcome = read_file(storage.as_ref(), &location).map_err(|e| {
                let error = format!("{e:#}");
                relay.error(ORIGIN, format!("dropping {location}: {error}"));
                error
            });
            let _ = tx.send((location, outcome));
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

    let mut report = DeserializeReport::default();
    let mut seen = HashSet::new();
    for (location, outcome) in rx.try_iter() {
        match outcome {
            Ok(mut records) => {
                relay.debug(ORIGIN, format!("{location}: {} record(s)", records.len()));
                report.records.append(&mut records);
                report.files_ok += 1;
            }
            Err(error) => report.failed.push(FileFailure {
                location: location.clone(),
                error,
            }),
        }
        seen.insert(location);
    }

    // A job that panicked released its slot without reporting.
    for entry in index.iter().filter(|e| !seen.contains(&e.location)) {
        relay.error(ORIGIN, format!("dropping {}: worker panicked", entry.location));
        report.failed.push(FileFailure {
            location: entry.location.clone(),
            error: "worker panicked".into(),
        });
    }

    relay.info(
        ORIGIN,
        format!(
            "parsed {} record(s) from {} file(s), {} file(s) dropped",
            report.records.len(),
            report.files_ok,
            report.failed.len()
        ),
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::LocalStorage;
    use crate::testing::sample_line;

    #[test]
    fn read_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2019-02-07-00-00-00-A");
        std::fs::write(&path, format!("{}\n\n{}\n", sample_line(), sample_line())).unwrap();

        let records = read_file(&LocalStorage, &path.to_string_lossy()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn read_file_names_the_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2019-02-07-00-00-00-B");
        std::fs::write(&path, format!("{}\nnot a log line\n", sample_line())).unwrap();

        let err = read_file(&LocalStorage, &path.to_string_lossy()).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
