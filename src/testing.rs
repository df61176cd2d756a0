//! Fixtures for exercising the exporter in tests.
//!
//! - [`sample_line`] and [`log_line`] produce raw access-log lines.
//! - [`CountingStorage`] wraps a [`Storage`] and records every call made through it.
//! - [`capture_relay`] starts a [`LogRelay`] that keeps every line in memory.

use crate::io::storage::{ObjectSink, Storage};
use crate::parse::parse_line;
use crate::record::NormalizedRecord;
use crate::relay::{LogLine, LogRelay};
use anyhow::Result;
use std::io::BufRead;
use std::sync::{Arc, Mutex, PoisonError};

/// A 23-field line: a GET by an IAM user from `1.2.3.4` at 2019-02-07 00:00:38 UTC.
pub const SAMPLE_LINE: &str = r#"bucketowner bucketname [07/Feb/2019:00:00:38 +0000] 1.2.3.4 arn:aws:iam::acct:user/u reqid REST.GET.OBJECT key "GET /key HTTP/1.1" 200 - 100 50 10 - "-" vid hostid SigV4 - AuthHeader s3.amazonaws.com TLSv1.2"#;

#[must_use]
pub const fn sample_line() -> &'static str {
    SAMPLE_LINE
}

/// A full 24-field line with the given partition and requester values.
///
/// `time` uses the bracketed log format, e.g. `07/Feb/2019:00:00:38 +0000`.
#[must_use]
pub fn log_line(
    bucket: &str,
    operation: &str,
    requester: &str,
    remote_ip: &str,
    time: &str,
) -> String {
    format!(
        r#"79a5 {bucket} [{time}] {remote_ip} {requester} 3E57427F3EXAMPLE {operation} photos/1.jpg "GET /{bucket}/photos/1.jpg HTTP/1.1" 200 - 2662992 3462992 70 10 "-" "S3Console/0.4" - s9lzHYrFp76ZVxRcpX9+5cjAnEH2ROuNkd2BHfIa6UkFVdtjf5mKR3/eTPFvsiP/XV/VLi31234= SigV4 ECDHE-RSA-AES128-GCM-SHA256 AuthHeader {bucket}.s3.us-west-1.amazonaws.com TLSv1.2"#
    )
}

/// [`sample_line`] normalized.
///
/// # Panics
///
/// Never, unless the fixture line itself is broken.
#[must_use]
pub fn sample_record() -> NormalizedRecord {
    match parse_line(SAMPLE_LINE, 1) {
        Ok(Some(rec)) => rec,
        other => panic!("sample line must parse: {other:?}"),
    }
}

/// A [`Storage`] that forwards to another and logs each call as `"<op> <location>"`.
pub struct CountingStorage {
    inner: Arc<dyn Storage>,
    calls: Mutex<Vec<String>>,
}

impl CountingStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, op: &str, location: &str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{op} {location}"));
    }
}

impl Storage for CountingStorage {
    fn open_read(&self, location: &str) -> Result<Box<dyn BufRead + Send>> {
        self.record("open_read", location);
        self.inner.open_read(location)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        self.record("glob", pattern);
        self.inner.glob(pattern)
    }

    fn exists(&self, location: &str) -> Result<bool> {
        self.record("exists", location);
        self.inner.exists(location)
    }

    fn touch(&self, location: &str, contents: &[u8]) -> Result<()> {
        self.record("touch", location);
        self.inner.touch(location, contents)
    }

    fn create(&self, location: &str) -> Result<Box<dyn ObjectSink>> {
        self.record("create", location);
        self.inner.create(location)
    }

    fn delete(&self, location: &str) -> Result<()> {
        self.record("delete", location);
        self.inner.delete(location)
    }

    fn create_dir_all(&self, location: &str) -> Result<()> {
        self.record("create_dir_all", location);
        self.inner.create_dir_all(location)
    }

    fn is_local(&self) -> bool {
        self.inner.is_local()
    }
}

/// A relay whose lines are collected into the returned vector.
///
/// Call [`LogRelay::shutdown`] before inspecting the lines to be sure every
/// queued line has arrived.
///
/// # Errors
///
/// Returns an error if the logging thread cannot be spawned.
pub fn capture_relay() -> std::io::Result<(LogRelay, Arc<Mutex<Vec<LogLine>>>)> {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let relay = LogRelay::with_sink(crate::relay::DEFAULT_CAPACITY, move |line| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    })?;
    Ok((relay, lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_lines_parse() {
        let line = log_line(
            "awsexamplebucket1",
            "REST.PUT.OBJECT",
            "arn:aws:sts::123456789012:assumed-role/Admin/session",
            "192.0.2.3",
            "06/Feb/2019:00:00:38 +0000",
        );
        let rec = parse_line(&line, 1).unwrap().unwrap();
        assert_eq!(rec.bucket_name, "awsexamplebucket1");
        assert_eq!(rec.tlsversion, "TLSv1.2");
        assert!(rec.is_assumed_role);
        assert!(!rec.is_user);
    }
}
