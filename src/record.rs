//! The typed access-log record and its declared Arrow schema.
//!
//! [`NormalizedRecord`] mirrors the output schema column for column, so a slice of
//! records converts to a `RecordBatch` through `serde_arrow` with the fields from
//! [`schema_fields`].

use arrow::datatypes::{DataType, Field, FieldRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Column names in schema order.
pub const COLUMNS: [&str; 35] = [
    "bucketowner",
    "bucket_name",
    "requestdatetime",
    "remoteip",
    "requester",
    "requestid",
    "operation",
    "key",
    "request_uri",
    "httpstatus",
    "errorcode",
    "bytessent",
    "objectsize",
    "totaltime",
    "turnaroundtime",
    "referrer",
    "useragent",
    "versionid",
    "hostid",
    "sigv",
    "ciphersuite",
    "authtype",
    "endpoint",
    "tlsversion",
    "ts",
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "datetime",
    "remoteip_int",
    "is_assumed_role",
    "is_user",
];

/// Columns that define the output directory layout.
pub const PARTITION_COLUMNS: [&str; 6] =
    ["bucket_name", "operation", "year", "month", "day", "hour"];

/// Columns that define row-group boundaries inside one partition file.
pub const ROW_GROUP_COLUMNS: [&str; 4] =
    ["requester", "remoteip_int", "is_assumed_role", "is_user"];

/// One access-log entry after normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub bucketowner: String,
    pub bucket_name: String,
    /// Request time as logged, without the surrounding brackets.
    pub requestdatetime: String,
    pub remoteip: String,
    pub requester: String,
    pub requestid: String,
    pub operation: String,
    pub key: String,
    pub request_uri: String,
    pub httpstatus: String,
    pub errorcode: String,
    pub bytessent: i64,
    pub objectsize: i64,
    pub totaltime: i64,
    pub turnaroundtime: i64,
    pub referrer: String,
    pub useragent: String,
    pub versionid: String,
    pub hostid: String,
    pub sigv: String,
    pub ciphersuite: String,
    pub authtype: String,
    pub endpoint: String,
    pub tlsversion: String,
    pub ts: i64,
    pub year: i64,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub datetime: String,
    pub remoteip_int: u32,
    pub is_assumed_role: bool,
    pub is_user: bool,
}

impl NormalizedRecord {
    /// Render a column as the string used in partition paths and grouping keys.
    ///
    /// Integers render without padding and booleans as `true`/`false`.
    /// Returns `None` for a name outside [`COLUMNS`].
    #[must_use]
    pub fn column_value(&self, column: &str) -> Option<String> {
        let value = match column {
            "bucketowner" => self.bucketowner.clone(),
            "bucket_name" => self.bucket_name.clone(),
            "requestdatetime" => self.requestdatetime.clone(),
            "remoteip" => self.remoteip.clone(),
            "requester" => self.requester.clone(),
            "requestid" => self.requestid.clone(),
            "operation" => self.operation.clone(),
            "key" => self.key.clone(),
            "request_uri" => self.request_uri.clone(),
            "httpstatus" => self.httpstatus.clone(),
            "errorcode" => self.errorcode.clone(),
            "bytessent" => self.bytessent.to_string(),
            "objectsize" => self.objectsize.to_string(),
            "totaltime" => self.totaltime.to_string(),
            "turnaroundtime" => self.turnaroundtime.to_string(),
            "referrer" => self.referrer.clone(),
            "useragent" => self.useragent.clone(),
            "versionid" => self.versionid.clone(),
            "hostid" => self.hostid.clone(),
            "sigv" => self.sigv.clone(),
            "ciphersuite" => self.ciphersuite.clone(),
            "authtype" => self.authtype.clone(),
            "endpoint" => self.endpoint.clone(),
            "tlsversion" => self.tlsversion.clone(),
            "ts" => self.ts.to_string(),
            "year" => self.year.to_string(),
            "month" => self.month.to_string(),
            "day" => self.day.to_string(),
            "hour" => self.hour.to_string(),
            "minute" => self.minute.to_string(),
            "second" => self.second.to_string(),
            "datetime" => self.datetime.clone(),
            "remoteip_int" => self.remoteip_int.to_string(),
            "is_assumed_role" => self.is_assumed_role.to_string(),
            "is_user" => self.is_user.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// Arrow type of each column.
fn column_type(column: &str) -> DataType {
    match column {
        "bytessent" | "objectsize" | "totaltime" | "turnaroundtime" | "ts" | "year" => {
            DataType::Int64
        }
        "month" | "day" | "hour" | "minute" | "second" => DataType::Int32,
        "remoteip_int" => DataType::UInt32,
        "is_assumed_role" | "is_user" => DataType::Boolean,
        _ => DataType::Utf8,
    }
}

/// The declared schema, in [`COLUMNS`] order. All columns are non-nullable.
#[must_use]
pub fn schema_fields() -> Vec<FieldRef> {
    COLUMNS
        .iter()
        .map(|name| Arc::new(Field::new(*name, column_type(name), false)))
        .collect()
}

/// Position of a column in the declared schema.
#[must_use]
pub fn column_index(column: &str) -> Option<usize> {
    COLUMNS.iter().position(|c| *c == column)
}
