//! Retry policy and object URI parsing shared by object-store adapters.

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind};
use std::fmt;
use std::time::Duration;

/// Exponential backoff for transient failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    /// Call `op` until it succeeds, fails permanently, or attempts run out.
    /// The delay doubles after each transient failure, capped at `max_delay`.
    ///
    /// # Errors
    ///
    /// Returns the last error.
    pub fn retry<T>(&self, mut op: impl FnMut() -> CloudResult<T>) -> CloudResult<T> {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.kind.is_transient() && attempt < self.attempts => {
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
                done => return done,
            }
        }
    }
}

/// A `scheme://bucket/key` location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectUri {
    pub scheme: String,
    pub bucket: String,
    /// May be empty for `s3://bucket` or `s3://bucket/`.
    pub key: String,
}

impl ObjectUri {
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] if there is no scheme or no bucket.
    pub fn parse(uri: &str) -> CloudResult<Self> {
        let invalid =
            |why: &str| CloudIOError::new(ErrorKind::InvalidInput, format!("{uri}: {why}"));
        let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid("no scheme"))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid("no bucket"));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// The same bucket with another key.
    #[must_use]
    pub fn with_key(&self, key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(attempts: u32) -> Backoff {
        Backoff {
            attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn transient_errors_are_retried() {
        let mut calls = 0;
        let got = quick(3).retry(|| {
            calls += 1;
            if calls < 3 {
                Err(CloudIOError::new(ErrorKind::Throttled, "slow down"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(got.unwrap(), 3);
    }

    #[test]
    fn attempts_are_capped() {
        let mut calls = 0;
        let got: CloudResult<()> = quick(2).retry(|| {
            calls += 1;
            Err(CloudIOError::new(ErrorKind::Unavailable, "503"))
        });
        assert_eq!(got.unwrap_err().kind, ErrorKind::Unavailable);
        assert_eq!(calls, 2);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut calls = 0;
        let got: CloudResult<()> = quick(5).retry(|| {
            calls += 1;
            Err(CloudIOError::new(ErrorKind::AccessDenied, "no"))
        });
        assert!(got.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn uri_parts() {
        let uri = ObjectUri::parse("s3://access-logs/raw/2019-02-07").unwrap();
        assert_eq!(uri.bucket, "access-logs");
        assert_eq!(uri.key, "raw/2019-02-07");
        assert_eq!(uri.with_key("x/y").to_string(), "s3://access-logs/x/y");

        assert_eq!(ObjectUri::parse("gs://b").unwrap().key, "");
        assert_eq!(
            ObjectUri::parse("access-logs/raw").unwrap_err().kind,
            ErrorKind::InvalidInput
        );
        assert!(ObjectUri::parse("s3:///raw").is_err());
    }
}
