//! Maps positional tokens to a [`NormalizedRecord`].

use crate::error::ParseError;
use crate::record::NormalizedRecord;
use chrono::{DateTime, Datelike, Timelike};
use std::net::Ipv4Addr;

/// Fields every line must carry (through `hostid`).
///
/// Shorter lines than [`MAX_FIELDS`] are taken as the older log layouts that end
/// before `sigv`; their missing trailing fields are stored as `-`.
pub const MIN_FIELDS: usize = 19;

/// Fields a line may carry at most (through `tlsversion`).
pub const MAX_FIELDS: usize = 24;

/// Format of the bracketed request time.
pub const REQUEST_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Parse one of the byte/time counters. `-` means zero.
///
/// # Errors
///
/// Returns [`ParseError::Numeric`] for anything else that is not an integer.
pub fn field_to_int(value: &str, field: &'static str, line: usize) -> Result<i64, ParseError> {
    if value == "-" {
        return Ok(0);
    }
    value.parse::<i64>().map_err(|_| ParseError::Numeric {
        line,
        field,
        value: value.to_string(),
    })
}

/// Convert a dotted-quad address to its 32-bit big-endian integer.
///
/// # Errors
///
/// Returns [`ParseError::RemoteIp`] if `value` is not an IPv4 literal.
pub fn ip_to_int(value: &str, line: usize) -> Result<u32, ParseError> {
    value
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| ParseError::RemoteIp {
            line,
            value: value.to_string(),
        })
}

/// Build a record from tokens produced by [`tokenize`](super::tokenize).
///
/// `line` is the 1-based line number, used only in error messages. Optional
/// trailing fields absent from the line default to `-`.
///
/// # Errors
///
/// Any [`ParseError`]: wrong field count, bad counter, bad timestamp or bad address.
pub fn normalize(tokens: &[&str], line: usize) -> Result<NormalizedRecord, ParseError> {
    if !(MIN_FIELDS..=MAX_FIELDS).contains(&tokens.len()) {
        return Err(ParseError::FieldCount {
            line,
            min: MIN_FIELDS,
            max: MAX_FIELDS,
            found: tokens.len(),
        });
    }
    let field = |i: usize| tokens.get(i).copied().unwrap_or("-").to_string();

    let requestdatetime = field(2);
    let when = DateTime::parse_from_str(&requestdatetime, REQUEST_TIME_FORMAT).map_err(|source| {
        ParseError::Timestamp {
            line,
            value: requestdatetime.clone(),
            source,
        }
    })?;

    let remoteip = field(3);
    let remoteip_int = ip_to_int(&remoteip, line)?;
    let requester = field(4);

    Ok(NormalizedRecord {
        bucketowner: field(0),
        bucket_name: field(1),
        remoteip,
        requestid: field(5),
        operation: field(6),
        key: field(7),
        request_uri: field(8),
        httpstatus: field(9),
        errorcode: field(10),
        bytessent: field_to_int(tokens[11], "bytessent", line)?,
        objectsize: field_to_int(tokens[12], "objectsize", line)?,
        totaltime: field_to_int(tokens[13], "totaltime", line)?,
        turnaroundtime: field_to_int(tokens[14], "turnaroundtime", line)?,
        referrer: field(15),
        useragent: field(16),
        versionid: field(17),
        hostid: field(18),
        sigv: field(19),
        ciphersuite: field(20),
        authtype: field(21),
        endpoint: field(22),
        tlsversion: field(23),
        ts: when.timestamp(),
        year: i64::from(when.year()),
        month: when.month() as i32,
        day: when.day() as i32,
        hour: when.hour() as i32,
        minute: when.minute() as i32,
        second: when.second() as i32,
        datetime: when.to_rfc3339(),
        is_assumed_role: requester.contains("assumed-role"),
        is_user: requester.contains("user"),
        requester,
        requestdatetime,
        remoteip_int,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_is_zero() {
        assert_eq!(field_to_int("-", "bytessent", 1).ok(), Some(0));
        assert_eq!(field_to_int("42", "bytessent", 1).ok(), Some(42));
        assert!(matches!(
            field_to_int("4x", "objectsize", 7),
            Err(ParseError::Numeric { line: 7, field: "objectsize", .. })
        ));
    }

    #[test]
    fn ip_conversion() {
        assert_eq!(ip_to_int("1.2.3.4", 1).ok(), Some(16_909_060));
        assert_eq!(ip_to_int("255.255.255.255", 1).ok(), Some(u32::MAX));
        assert!(ip_to_int("1.2.3", 1).is_err());
        assert!(ip_to_int("-", 1).is_err());
    }
}
