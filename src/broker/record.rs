//! Record definitions
//!
//! A `Record` is one message in a folder log. On disk and on the wire it is the
//! line `<timestamp>-<payload>`: the timestamp is everything before the first
//! `-`, the payload is everything after it and may itself contain `-`.
//!
//! Notes on fields:
//! - `timestamp`: seconds since UNIX epoch, assigned by the broker on post
//! - `payload`: opaque text; never contains a newline or `RECORD_SEPARATOR`

use std::fmt;

/// Separator written after each record when records are sent as one text
/// body. Payloads may not contain it.
pub const RECORD_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: i64,
    pub payload: String,
}

impl Record {
    pub fn new(timestamp: i64, payload: impl Into<String>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Parse a single log line. Returns `None` when the line has no `-`
    /// separator or its leading segment is not an integer.
    pub fn parse(line: &str) -> Option<Self> {
        let (timestamp, payload) = line.split_once('-')?;
        let timestamp = timestamp.parse::<i64>().ok()?;
        Some(Self::new(timestamp, payload))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.payload)
    }
}

/// Non-empty lines of a folder log, in file order.
pub fn log_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents.split('\n').filter(|line| !line.is_empty())
}

/// Serialize records as a folder log: one `\n`-terminated line each.
pub fn to_log(records: &[Record]) -> String {
    records.iter().map(|record| format!("{record}\n")).collect()
}
