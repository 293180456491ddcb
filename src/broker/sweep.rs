//! Expiry sweep over a folder log
//!
//! `sweep` is the read side of the broker with the I/O taken out: given the
//! full text of a log, the current time and a cursor it decides which records
//! the caller gets back, which records survive, and whether the log has to be
//! rewritten at all.
//!
//! A record is fresh while `timestamp > now - window`. The response filter
//! (`timestamp >= cursor`) is independent of freshness, so a stale record is
//! still returned by the read that expires it. Malformed lines count as stale
//! and are never returned. The PHP `get.php` this protocol comes from did echo
//! them back (its cursor test compared strings), but a line without a
//! timestamp has no place in a `<timestamp>-<payload>` reply.

use serde::Deserialize;
use tracing::debug;

use crate::broker::record::{Record, log_lines};

/// Rule deciding whether a sweep rewrites the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionTrigger {
    /// Rewrite when any line in the log is stale.
    #[default]
    AnyStale,
    /// Rewrite only when the last non-empty line is stale. Stale records
    /// ahead of a fresh tail linger until the tail itself expires.
    ///
    /// `get.php` looked at the last element of `explode("\n", ...)`, which
    /// for a newline-terminated log is the empty string after the final
    /// newline and always counts as stale, so in practice it rewrote on every
    /// read. This mode keeps the documented "last record decides" rule
    /// instead.
    LastRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sweep {
    /// Records with `timestamp >= cursor`, in log order.
    pub matched: Vec<Record>,
    /// Fresh records, in log order.
    pub retained: Vec<Record>,
    /// Whether the log should be replaced by `retained`.
    pub compact: bool,
}

pub fn sweep(
    contents: &str,
    now: i64,
    window_secs: i64,
    cursor: i64,
    trigger: CompactionTrigger,
) -> Sweep {
    let cutoff = now.saturating_sub(window_secs);
    let mut result = Sweep::default();
    let mut any_stale = false;
    let mut last_stale = false;

    for line in log_lines(contents) {
        let stale = match Record::parse(line) {
            Some(record) => {
                let stale = record.timestamp <= cutoff;
                if record.timestamp >= cursor {
                    result.matched.push(record.clone());
                }
                if !stale {
                    result.retained.push(record);
                }
                stale
            }
            None => {
                debug!(line, "dropping malformed record");
                true
            }
        };
        any_stale |= stale;
        last_stale = stale;
    }

    result.compact = match trigger {
        CompactionTrigger::AnyStale => any_stale,
        CompactionTrigger::LastRecord => last_stale,
    };
    result
}
