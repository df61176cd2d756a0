//! Error taxonomy for the exporter.
//!
//! - [`ParseError`] - a single log line could not be tokenized or normalized.
//!   Fatal for the containing file only.
//! - [`SignalError`] - misuse or expiry of a [`CompletionSignal`](crate::CompletionSignal).
//! - [`ExportError`] - run-level failures: configuration, stage timeouts and
//!   partition write failures.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning one raw line into a [`NormalizedRecord`](crate::NormalizedRecord).
#[derive(Error, Debug)]
pub enum ParseError {
    /// The line did not tokenize into an acceptable number of fields.
    #[error("line {line}: expected {min} to {max} fields, found {found}")]
    FieldCount {
        line: usize,
        min: usize,
        max: usize,
        found: usize,
    },

    /// A numeric column held something other than `-` or an integer.
    #[error("line {line}: field `{field}` is not numeric: {value:?}")]
    Numeric {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// The request timestamp did not match `day/Mon/Year:H:M:S ±ZZZZ`.
    #[error("line {line}: invalid request timestamp {value:?}")]
    Timestamp {
        line: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The remote address is not a dotted-quad IPv4 literal.
    #[error("line {line}: invalid remote ip {value:?}")]
    RemoteIp { line: usize, value: String },
}

/// Errors raised by the completion barrier.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignalError {
    /// `wait` gave up before the counter reached zero.
    #[error("timed out after {timeout:?} with {outstanding} task(s) outstanding")]
    Timeout {
        timeout: Duration,
        outstanding: usize,
    },

    /// `done` was called more times than `add` registered.
    #[error("done() called with no outstanding tasks")]
    Underflow,
}

/// Run-level failures. Each maps to a non-zero exit of the CLI.
#[derive(Error, Debug)]
pub enum ExportError {
    /// A required setting is absent or empty.
    #[error("{0} is missing")]
    MissingSetting(&'static str),

    /// A setting is present but malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Removing the partition columns left nothing to write.
    #[error("no data left to save outside partition columns")]
    NoDataColumns,

    /// A partition or row-group column is not part of the record schema.
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// A completion barrier expired; the stuck stage is named.
    #[error("{stage} stage did not finish: {source}")]
    StageTimeout {
        stage: &'static str,
        #[source]
        source: SignalError,
    },

    /// One or more partition files failed to write.
    #[error("{failed} of {total} partition(s) failed to write")]
    PartitionWrites { failed: usize, total: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExportError {
    /// True for errors raised before any I/O is attempted.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingSetting(_) | Self::Config(_) | Self::NoDataColumns | Self::UnknownColumn(_)
        )
    }
}
