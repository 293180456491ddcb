//! The `client` module provides `FolderClient`, an async HTTP client for the
//! folder server, used by the command line and the end-to-end tests.

pub mod http_client;
pub use http_client::FolderClient;
