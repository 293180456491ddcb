//! The `transport` module handles network communication with clients over
//! HTTP.
//!
//! It defines the query-string protocol and plain-text replies, and the axum
//! server that forwards requests to the broker.

pub mod http;
pub mod message;

pub use http::{create_router, serve, start_http_server};
