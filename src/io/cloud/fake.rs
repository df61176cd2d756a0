//! In-memory object store for tests.
//!
//! Clones of a [`FakeObjectIO`] share one store. Uploads whose key contains a
//! registered fragment are rejected, which lets tests break single partitions.

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind, ObjectEntry, ObjectIO};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    buckets: HashSet<String>,
    objects: BTreeMap<(String, String), Vec<u8>>,
    rejected: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeObjectIO {
    state: Arc<Mutex<State>>,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject every later upload whose key contains `fragment`.
    pub fn fail_puts_containing(&self, fragment: impl Into<String>) {
        self.state().rejected.push(fragment.into());
    }

    /// Keys stored in `bucket`, sorted.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.state()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

impl ObjectIO for FakeObjectIO {
    fn put(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        let mut state = self.state();
        if state.rejected.iter().any(|f| key.contains(f.as_str())) {
            return Err(CloudIOError::new(
                ErrorKind::AccessDenied,
                format!("upload of {bucket}/{key} rejected"),
            ));
        }
        state.buckets.insert(bucket.to_string());
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        self.state()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| CloudIOError::not_found(bucket, key))
    }

    fn delete(&self, bucket: &str, key: &str) -> CloudResult<()> {
        self.state()
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn list(&self, bucket: &str, prefix: &str) -> CloudResult<Vec<ObjectEntry>> {
        let state = self.state();
        if !state.buckets.contains(bucket) {
            return Err(CloudIOError::new(
                ErrorKind::NotFound,
                format!("bucket {bucket} does not exist"),
            ));
        }
        Ok(state
            .objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, key), data)| ObjectEntry {
                key: key.clone(),
                size: data.len() as u64,
            })
            .collect())
    }

    fn exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        Ok(self
            .state()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_objects() {
        let a = FakeObjectIO::new();
        let b = a.clone();
        a.put("logs", "k2", b"2").unwrap();
        a.put("logs", "k1", b"1").unwrap();
        assert_eq!(b.keys("logs"), vec!["k1", "k2"]);
        assert_eq!(b.get("logs", "k1").unwrap(), b"1");
    }

    #[test]
    fn missing_bucket_and_key() {
        let store = FakeObjectIO::new();
        assert_eq!(store.list("none", "").unwrap_err().kind, ErrorKind::NotFound);
        store.put("b", "x", b"").unwrap();
        assert_eq!(store.get("b", "y").unwrap_err().kind, ErrorKind::NotFound);
        assert!(store.list("b", "y").unwrap().is_empty());
        store.delete("b", "y").unwrap();
    }

    #[test]
    fn rejected_uploads_store_nothing() {
        let store = FakeObjectIO::new();
        store.fail_puts_containing("bad");
        let err = store.put("b", "a/bad/c", b"x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
        assert!(!err.kind.is_transient());
        assert!(store.keys("b").is_empty());
    }
}
