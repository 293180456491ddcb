use std::fmt;

use serde::Deserialize;

use crate::broker::Record;

/// Body returned for every request the server refuses.
pub const REJECTED: &str = "-1";

pub use crate::broker::record::RECORD_SEPARATOR;

/// Query string of `/get`.
#[derive(Debug, Default, Deserialize)]
pub struct GetQuery {
    pub folder: Option<String>,
    pub time: Option<String>,
}

impl GetQuery {
    /// The cursor, defaulting to 0 when absent, empty or not an integer.
    pub fn cursor(&self) -> i64 {
        match self.time.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::debug!(time = raw, "ignoring unparseable cursor");
                0
            }),
        }
    }
}

/// Query string of `/put`.
#[derive(Debug, Default, Deserialize)]
pub struct PutQuery {
    pub folder: Option<String>,
    pub msg: Option<String>,
}

/// Plain-text reply body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Rejected,
    Records(Vec<Record>),
    Posted(i64),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Rejected => f.write_str(REJECTED),
            Reply::Records(records) => {
                for record in records {
                    write!(f, "{record}{RECORD_SEPARATOR}")?;
                }
                Ok(())
            }
            Reply::Posted(timestamp) => write!(f, "{timestamp}"),
        }
    }
}
