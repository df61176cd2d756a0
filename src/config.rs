//! Run configuration.
//!
//! [`ExportConfig`] carries everything one invocation needs. It is validated with
//! [`ExportConfig::validate`] before any storage is touched.

use crate::error::ExportError;
use crate::io::cloud::CloudConfig;
use crate::io::storage::join_location;
use crate::runner::Parallelism;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default stage timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const HOUR_FORMAT: &str = "%Y-%m-%d-%H";

/// One UTC hour, written `YYYY-MM-DD-HH`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hour(NaiveDateTime);

impl Hour {
    /// The hour before the one containing `now`.
    #[must_use]
    pub fn previous(now: DateTime<Utc>) -> Self {
        let earlier = (now - ChronoDuration::hours(1)).naive_utc();
        Self(truncate_to_hour(earlier))
    }

    /// The hour before the current one.
    #[must_use]
    pub fn previous_utc() -> Self {
        Self::previous(Utc::now())
    }

    /// Start of the hour.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.0.and_utc()
    }
}

fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_hms_opt(t.hour(), 0, 0).unwrap_or(t)
}

impl FromStr for Hour {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExportError::Config(format!("hour {s:?} is not YYYY-MM-DD-HH"));
        if s.len() != 13 {
            return Err(invalid());
        }
        NaiveDateTime::parse_from_str(&format!("{s}-00-00"), "%Y-%m-%d-%H-%M-%S")
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(HOUR_FORMAT))
    }
}

/// Region, endpoint and ACL forwarded to an object-store client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageOptions {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub acl: Option<String>,
}

impl CloudConfig for StorageOptions {
    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn acl(&self) -> Option<&str> {
        self.acl.as_deref()
    }
}

/// Settings for one export run.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Directory or `s3://bucket/prefix` holding raw log files.
    pub source_root: String,
    /// Directory or `s3://bucket/prefix` receiving the dataset.
    pub destination_root: String,
    /// Where hour markers live. `None` disables tracking.
    pub tracking_root: Option<String>,
    pub hour: Hour,
    /// Limit for each of the two stage barriers.
    pub timeout: Duration,
    pub parallelism: Parallelism,
    pub input: StorageOptions,
    pub output: StorageOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            source_root: String::new(),
            destination_root: String::new(),
            tracking_root: None,
            hour: Hour::previous_utc(),
            timeout: DEFAULT_TIMEOUT,
            parallelism: Parallelism::default(),
            input: StorageOptions::default(),
            output: StorageOptions::default(),
        }
    }
}

impl ExportConfig {
    /// Check required settings. An empty tracking root is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::MissingSetting`] for an empty source or destination,
    /// or [`ExportError::Config`] for a zero timeout.
    pub fn validate(mut self) -> Result<Self, ExportError> {
        if self.source_root.is_empty() {
            return Err(ExportError::MissingSetting("src"));
        }
        if self.destination_root.is_empty() {
            return Err(ExportError::MissingSetting("dst"));
        }
        if self.timeout.is_zero() {
            return Err(ExportError::Config("timeout must be positive".into()));
        }
        self.tracking_root = self.tracking_root.filter(|t| !t.is_empty());
        Ok(self)
    }

    /// Glob selecting the source files of the target hour.
    #[must_use]
    pub fn source_pattern(&self) -> String {
        join_location(&self.source_root, &format!("{}*", self.hour))
    }
}
