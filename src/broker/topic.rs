//! Folder names
//!
//! A folder is addressed by name and maps to exactly one flat file in the data
//! directory. A valid name starts with an ASCII letter, digit or underscore;
//! nothing after the first character is constrained except that path
//! separators and NUL are refused, since the name becomes a file name.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderName(String);

impl FolderName {
    /// Validate `raw` as a folder name.
    pub fn parse(raw: &str) -> Option<Self> {
        let first = raw.bytes().next()?;
        if !(first.is_ascii_alphanumeric() || first == b'_') {
            return None;
        }
        if raw.contains(['/', '\\', '\0']) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
