//! Hour-level completion markers.
//!
//! After an hour is exported, an empty-ish object named after the hour is written
//! under the tracking root. Its presence makes later runs for the same hour a no-op.

use crate::config::Hour;
use crate::io::storage::{Storage, join_location};
use anyhow::Result;
use std::sync::Arc;

pub struct Tracker {
    storage: Arc<dyn Storage>,
    root: String,
}

impl Tracker {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    /// `<root>/<YYYY-MM-DD-HH>`.
    #[must_use]
    pub fn marker_location(&self, hour: Hour) -> String {
        join_location(&self.root, &hour.to_string())
    }

    /// # Errors
    ///
    /// Returns an error if the marker's existence cannot be checked.
    pub fn is_tracked(&self, hour: Hour) -> Result<bool> {
        self.storage.exists(&self.marker_location(hour))
    }

    /// Write the marker for `hour` with `note` as its content.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn mark(&self, hour: Hour, note: &str) -> Result<()> {
        if self.storage.is_local() {
            self.storage.create_dir_all(&self.root)?;
        }
        self.storage.touch(&self.marker_location(hour), note.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::LocalStorage;

    #[test]
    fn mark_then_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tracking");
        let tracker = Tracker::new(Arc::new(LocalStorage), root.to_string_lossy());
        let hour: Hour = "2019-02-07-00".parse().unwrap();

        assert!(!tracker.is_tracked(hour).unwrap());
        tracker.mark(hour, "3 files").unwrap();
        assert!(tracker.is_tracked(hour).unwrap());
        assert_eq!(std::fs::read_to_string(root.join("2019-02-07-00")).unwrap(), "3 files");
    }
}
