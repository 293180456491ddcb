//! The `error` module defines the error types used within `folderpost`.
//!
//! Library code returns these through `Result` and `?`. Only the HTTP edge
//! flattens them into the `-1` sentinel the protocol expects.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the flat-file folder store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read folder log {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write folder log {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to replace folder log {path}: {source}")]
    Rename { path: PathBuf, source: io::Error },

    #[error("failed to remove folder log {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },

    #[error("failed to create data directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
}

/// Failures surfaced by broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid folder name: {0:?}")]
    InvalidFolder(String),

    #[error("invalid message: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected the request")]
    Rejected,

    #[error("malformed record in response: {0:?}")]
    MalformedRecord(String),

    #[error("unexpected response body: {0:?}")]
    UnexpectedBody(String),
}
