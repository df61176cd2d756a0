//! Splits one access-log line into raw field tokens.
//!
//! Tokens are recognized left to right, in priority order:
//! 1. a double-quoted span, yielding its content verbatim (no escapes),
//! 2. a bracketed span, yielding its content,
//! 3. otherwise a maximal run of non-space characters.
//!
//! The timestamp `[07/Feb/2019:00:00:38 +0000]` is therefore a single token. Logs
//! written in the legacy layout, where the timestamp is split into two unbracketed
//! tokens, are not accepted.

use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|\[([^\]]*)\]|([^ ]+)"#).expect("valid token regex")
});

/// Tokenize one line. The returned slices borrow from `line`.
///
/// A trailing `\r` or `\n` is ignored.
#[must_use]
pub fn tokenize(line: &str) -> Vec<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    TOKEN
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str())
        .collect()
}
