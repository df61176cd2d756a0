//! Access-log parsing: tokenization plus normalization into typed records.
//!
//! - [`tokenize`] splits a raw line into field tokens.
//! - [`normalize`] maps tokens onto a [`NormalizedRecord`].
//! - [`parse_line`] and [`parse_lines`] combine the two.
//!
//! # Example
//!
//! ```
//! use s3access::parse::parse_line;
//!
//! let line = r#"owner bucket [07/Feb/2019:00:00:38 +0000] 1.2.3.4 arn:aws:iam::acct:user/u req REST.GET.OBJECT key "GET /key HTTP/1.1" 200 - 100 50 10 - "-" "curl" - host"#;
//! let rec = parse_line(line, 1)?.expect("not blank");
//! assert_eq!(rec.remoteip_int, 16_909_060);
//! assert!(rec.is_user);
//! # Ok::<(), s3access::ParseError>(())
//! ```

mod normalize;
mod tokenizer;

pub use normalize::{
    MAX_FIELDS, MIN_FIELDS, REQUEST_TIME_FORMAT, field_to_int, ip_to_int, normalize,
};
pub use tokenizer::tokenize;

use crate::error::ParseError;
use crate::record::NormalizedRecord;
use anyhow::{Context, Result};
use std::io::BufRead;

/// Parse one line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns the [`ParseError`] for a malformed line.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<NormalizedRecord>, ParseError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    normalize(&tokenize(line), line_no).map(Some)
}

/// Parse every line of a reader. The first malformed line fails the whole input.
///
/// # Errors
///
/// Returns an error on a read failure or on the first malformed line.
pub fn parse_lines(reader: impl BufRead) -> Result<Vec<NormalizedRecord>> {
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.with_context(|| format!("read line {line_no}"))?;
        if let Some(rec) = parse_line(&line, line_no)? {
            out.push(rec);
        }
    }
    Ok(out)
}
