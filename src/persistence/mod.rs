//! The `persistence` module stores folder logs on disk.
//!
//! It uses plain text files, one per folder, so that logs stay readable and
//! can be inspected or edited with ordinary tools.

pub mod file_store;

pub use file_store::FolderStore;
