//! The storage capability used by every stage.
//!
//! A location is a plain string: a filesystem path for [`LocalStorage`], an
//! `s3://bucket/key` URI for [`ObjectStorage`]. Both use `/` as separator, so
//! [`join_location`] builds paths for either.

use crate::config::StorageOptions;
use crate::io::cloud::helpers::{Backoff, ObjectUri};
use crate::io::cloud::{CloudConfig, ErrorKind, ObjectIO};
use crate::io::glob::{expand_glob, literal_prefix, matches};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Cursor, Write};
use std::path::Path;
use std::sync::Arc;

/// A file being written. Content becomes visible at [`commit`](ObjectSink::commit).
pub trait ObjectSink: Write + Send {
    /// Finish the write.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or uploading fails.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Read, list, and write operations over one backend.
pub trait Storage: Send + Sync {
    /// Open a location for sequential line reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the location is missing or unreadable.
    fn open_read(&self, location: &str) -> Result<Box<dyn BufRead + Send>>;

    /// Locations matching a glob pattern, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid pattern or a failed listing.
    fn glob(&self, pattern: &str) -> Result<Vec<String>>;

    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self, location: &str) -> Result<bool>;

    /// Create or replace a small object holding `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn touch(&self, location: &str, contents: &[u8]) -> Result<()>;

    /// Open a location for writing, replacing any existing content on commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be opened.
    fn create(&self, location: &str) -> Result<Box<dyn ObjectSink>>;

    /// Remove a location. Removing a missing location succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn delete(&self, location: &str) -> Result<()>;

    /// Create a directory and its parents. Object stores have no directories and
    /// treat this as a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&self, location: &str) -> Result<()>;

    /// Whether locations are local filesystem paths.
    fn is_local(&self) -> bool;
}

/// Append one `/`-separated segment to a location.
#[must_use]
pub fn join_location(root: &str, segment: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), segment.trim_start_matches('/'))
}

/// The final path segment of a location.
#[must_use]
pub fn location_name(location: &str) -> &str {
    location.rsplit('/').next().unwrap_or(location)
}

/// Whether a root names an object store rather than a local path.
#[must_use]
pub fn is_object_uri(root: &str) -> bool {
    root.contains("://")
}

// ============================================================================
// LocalStorage
// ============================================================================

/// The local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

struct LocalSink {
    writer: BufWriter<File>,
}

impl Write for LocalSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl ObjectSink for LocalSink {
    fn commit(mut self: Box<Self>) -> Result<()> {
        self.writer.flush().context("flush local file")
    }
}

impl Storage for LocalStorage {
    fn open_read(&self, location: &str) -> Result<Box<dyn BufRead + Send>> {
        let f = File::open(location).with_context(|| format!("open {location}"))?;
        Ok(Box::new(BufReader::new(f)))
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(expand_glob(pattern)?
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect())
    }

    fn exists(&self, location: &str) -> Result<bool> {
        Path::new(location)
            .try_exists()
            .with_context(|| format!("stat {location}"))
    }

    fn touch(&self, location: &str, contents: &[u8]) -> Result<()> {
        fs::write(location, contents).with_context(|| format!("write {location}"))
    }

    fn create(&self, location: &str) -> Result<Box<dyn ObjectSink>> {
        let f = File::create(location).with_context(|| format!("create {location}"))?;
        Ok(Box::new(LocalSink {
            writer: BufWriter::new(f),
        }))
    }

    fn delete(&self, location: &str) -> Result<()> {
        match fs::remove_file(location) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("remove {location}"))
            }
            _ => Ok(()),
        }
    }

    fn create_dir_all(&self, location: &str) -> Result<()> {
        fs::create_dir_all(location).with_context(|| format!("mkdir -p {location}"))
    }

    fn is_local(&self) -> bool {
        true
    }
}

// ============================================================================
// ObjectStorage
// ============================================================================

/// Adapts an [`ObjectIO`] client to [`Storage`]. Locations are `scheme://bucket/key`.
///
/// Transient client errors are retried with exponential backoff, up to
/// [`CloudConfig::max_attempts`] attempts from the supplied options.
#[derive(Clone)]
pub struct ObjectStorage {
    io: Arc<dyn ObjectIO>,
    options: StorageOptions,
    backoff: Backoff,
}

impl ObjectStorage {
    pub fn new(io: Arc<dyn ObjectIO>, options: StorageOptions) -> Self {
        let backoff = Backoff {
            attempts: options.max_attempts().max(1),
            ..Backoff::default()
        };
        Self {
            io,
            options,
            backoff,
        }
    }

    /// Region, endpoint and ACL this store was configured with.
    #[must_use]
    pub const fn options(&self) -> &StorageOptions {
        &self.options
    }
}

struct BufferedUpload {
    io: Arc<dyn ObjectIO>,
    backoff: Backoff,
    uri: ObjectUri,
    buf: Vec<u8>,
}

impl Write for BufferedUpload {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ObjectSink for BufferedUpload {
    fn commit(self: Box<Self>) -> Result<()> {
        let Self {
            io,
            backoff,
            uri,
            buf,
        } = *self;
        backoff
            .retry(|| io.put(&uri.bucket, &uri.key, &buf))
            .with_context(|| format!("upload {uri}"))
    }
}

impl Storage for ObjectStorage {
    fn open_read(&self, location: &str) -> Result<Box<dyn BufRead + Send>> {
        let uri = ObjectUri::parse(location)?;
        let bytes = self
            .backoff
            .retry(|| self.io.get(&uri.bucket, &uri.key))
            .with_context(|| format!("download {location}"))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let uri = ObjectUri::parse(pattern)?;
        let prefix = literal_prefix(&uri.key);
        let listed = match self.backoff.retry(|| self.io.list(&uri.bucket, prefix)) {
            Err(e) if e.kind == ErrorKind::NotFound => Vec::new(),
            other => other.with_context(|| format!("list {pattern}"))?,
        };
        let mut out = Vec::new();
        for object in listed {
            if matches(&uri.key, &object.key)? {
                out.push(uri.with_key(&object.key).to_string());
            }
        }
        Ok(out)
    }

    fn exists(&self, location: &str) -> Result<bool> {
        let uri = ObjectUri::parse(location)?;
        self.backoff
            .retry(|| self.io.exists(&uri.bucket, &uri.key))
            .with_context(|| format!("head {location}"))
    }

    fn touch(&self, location: &str, contents: &[u8]) -> Result<()> {
        let uri = ObjectUri::parse(location)?;
        self.backoff
            .retry(|| self.io.put(&uri.bucket, &uri.key, contents))
            .with_context(|| format!("upload {location}"))
    }

    fn create(&self, location: &str) -> Result<Box<dyn ObjectSink>> {
        Ok(Box::new(BufferedUpload {
            io: Arc::clone(&self.io),
            backoff: self.backoff,
            uri: ObjectUri::parse(location)?,
            buf: Vec::new(),
        }))
    }

    fn delete(&self, location: &str) -> Result<()> {
        let uri = ObjectUri::parse(location)?;
        self.backoff
            .retry(|| self.io.delete(&uri.bucket, &uri.key))
            .with_context(|| format!("delete {location}"))
    }

    fn create_dir_all(&self, _location: &str) -> Result<()> {
        Ok(())
    }

    fn is_local(&self) -> bool {
        false
    }
}
