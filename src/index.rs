//! Source file discovery.
//!
//! S3 server access log objects are named `YYYY-MM-DD-HH-MM-SS-<unique>`. The index
//! lists every file matching a pattern and records the delivery time taken from
//! its name.

use crate::io::storage::{Storage, location_name};
use crate::relay::RelayHandle;
use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};

const ORIGIN: &str = "index";

/// Length of the `YYYY-MM-DD-HH-MM-SS` name prefix.
const NAME_TIME_LEN: usize = 19;

/// One discovered source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileIndexEntry {
    pub location: String,
    /// Delivery time encoded in the file name.
    pub datetime: DateTime<Utc>,
}

/// Source files in location order.
#[derive(Clone, Debug, Default)]
pub struct FileIndex {
    entries: Vec<FileIndexEntry>,
}

impl FileIndex {
    /// List `pattern` on `storage`. Names without a parseable time prefix are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub fn build(storage: &dyn Storage, pattern: &str, relay: &RelayHandle) -> Result<Self> {
        let mut entries = Vec::new();
        for location in storage.glob(pattern)? {
            match parse_file_time(location_name(&location)) {
                Some(datetime) => entries.push(FileIndexEntry { location, datetime }),
                None => relay.warn(ORIGIN, format!("skipping {location}: name has no timestamp")),
            }
        }
        entries.sort_by(|a, b| a.location.cmp(&b.location));
        relay.debug(ORIGIN, format!("{} file(s) match {pattern}", entries.len()));
        Ok(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileIndexEntry> {
        self.entries.iter()
    }
}

impl From<Vec<FileIndexEntry>> for FileIndex {
    fn from(entries: Vec<FileIndexEntry>) -> Self {
        Self { entries }
    }
}

/// Delivery time from a log file name, or `None` if the name does not start
/// with `YYYY-MM-DD-HH-MM-SS`.
#[must_use]
pub fn parse_file_time(name: &str) -> Option<DateTime<Utc>> {
    let prefix = name.get(..NAME_TIME_LEN)?;
    NaiveDateTime::parse_from_str(prefix, "%Y-%m-%d-%H-%M-%S")
        .ok()
        .map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_delivery_time() {
        assert_eq!(
            parse_file_time("2019-02-07-00-10-03-5A2F3B1C9D8E7F60"),
            Some(Utc.with_ymd_and_hms(2019, 2, 7, 0, 10, 3).unwrap())
        );
        assert_eq!(
            parse_file_time("2019-02-07-00-10-03"),
            parse_file_time("2019-02-07-00-10-03-x")
        );
    }

    #[test]
    fn rejects_foreign_names() {
        assert_eq!(parse_file_time("README"), None);
        assert_eq!(parse_file_time("2019-02-07-00-xx-03-ABC"), None);
        assert_eq!(parse_file_time("2019-02-07"), None);
    }
}
