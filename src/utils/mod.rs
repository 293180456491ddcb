//! The `utils` module provides shared pieces used across `folderpost`:
//! typed errors and logging setup.

pub mod error;
pub mod logging;
