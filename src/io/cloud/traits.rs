//! The object-store client trait and its error type.
//!
//! Clients are synchronous. One backed by an async SDK blocks on its own runtime.

use thiserror::Error;

/// What went wrong in an object-store call, as far as retrying is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials were rejected or lack the needed permission.
    AccessDenied,
    /// The bucket or key does not exist.
    NotFound,
    /// The request was malformed, e.g. a location without a bucket.
    InvalidInput,
    /// The service asked the client to slow down.
    Throttled,
    /// Connection failures, timeouts and 5xx responses.
    Unavailable,
    Other,
}

impl ErrorKind {
    /// Whether the same call may succeed if repeated.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Throttled | Self::Unavailable)
    }
}

/// Error returned by [`ObjectIO`] calls.
#[derive(Error, Clone, Debug)]
#[error("{kind:?}: {message}")]
pub struct CloudIOError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CloudIOError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("{bucket}/{key} does not exist"))
    }
}

pub type CloudResult<T> = Result<T, CloudIOError>;

/// Connection settings an embedding application hands to its client.
pub trait CloudConfig: Send + Sync {
    fn region(&self) -> Option<&str> {
        None
    }

    /// Custom endpoint, e.g. for an S3-compatible service.
    fn endpoint(&self) -> Option<&str> {
        None
    }

    /// Canned ACL applied to uploaded objects.
    fn acl(&self) -> Option<&str> {
        None
    }

    /// Attempts per call when failures are transient.
    fn max_attempts(&self) -> u32 {
        3
    }
}

/// One listed object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// Bucket/key object storage.
pub trait ObjectIO: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected or fails.
    fn put(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()>;

    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] for a missing object, or another error if
    /// the download fails.
    fn get(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;

    /// Remove an object. Removing a missing object succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal is rejected or fails.
    fn delete(&self, bucket: &str, key: &str) -> CloudResult<()>;

    /// Objects whose key starts with `prefix`, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] for a missing bucket, or another error if
    /// the listing fails.
    fn list(&self, bucket: &str, prefix: &str) -> CloudResult<Vec<ObjectEntry>>;

    /// # Errors
    ///
    /// Returns an error if the check is rejected or fails.
    fn exists(&self, bucket: &str, key: &str) -> CloudResult<bool>;
}
