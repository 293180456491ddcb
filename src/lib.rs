//! # folderpost
//!
//! `folderpost` is a small HTTP message drop: clients post short messages into
//! named folders and poll for messages newer than a timestamp. Messages expire
//! after a retention window (five minutes by default), and expiry happens
//! inline on every read.
//!
//! ## Core Modules
//!
//! - `broker`: records, folder names, the expiry sweep and the engine that
//!   serializes access per folder.
//! - `client`: an async HTTP client for the server.
//! - `config`: loads settings from defaults, `config/default.*` and the
//!   environment.
//! - `persistence`: one flat text file per folder.
//! - `transport`: the axum HTTP server and its plain-text protocol.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod persistence;
pub mod transport;
pub mod utils;
