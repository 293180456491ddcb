//! HTTP client
//!
//! `FolderClient` speaks the query-string protocol of the server: it posts
//! messages with `/put` and polls with `/get`, decoding the `|`-separated
//! reply into records.

use crate::broker::Record;
use crate::transport::message::{RECORD_SEPARATOR, REJECTED};
use crate::utils::error::ClientError;

#[derive(Debug, Clone)]
pub struct FolderClient {
    base_url: String,
    http: reqwest::Client,
}

impl FolderClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch records of `folder`, optionally only those at or after `since`.
    pub async fn fetch(&self, folder: &str, since: Option<i64>) -> Result<Vec<Record>, ClientError> {
        let mut query = vec![("folder", folder.to_string())];
        if let Some(since) = since {
            query.push(("time", since.to_string()));
        }

        let body = self
            .http
            .get(format!("{}/get", self.base_url))
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_records(&body)
    }

    /// Post `msg` to `folder`, returning the timestamp the server assigned.
    pub async fn post(&self, folder: &str, msg: &str) -> Result<i64, ClientError> {
        let body = self
            .http
            .get(format!("{}/put", self.base_url))
            .query(&[("folder", folder), ("msg", msg)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if body == REJECTED {
            return Err(ClientError::Rejected);
        }
        body.trim()
            .parse()
            .map_err(|_| ClientError::UnexpectedBody(body))
    }
}

/// Decode a `/get` reply body.
pub fn parse_records(body: &str) -> Result<Vec<Record>, ClientError> {
    if body == REJECTED {
        return Err(ClientError::Rejected);
    }
    body.split(RECORD_SEPARATOR)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            Record::parse(chunk).ok_or_else(|| ClientError::MalformedRecord(chunk.to_string()))
        })
        .collect()
}
