//! File metadata returned by storage backends.

use std::path::{Path, PathBuf};

/// File metadata returned by storage backends.
///
/// This represents information about a file in storage, used for listing
/// operations and the cheap "is this asset already good enough" checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self { path: path.into(), size }
    }

    /// File name of a top-level file, `None` for anything nested in a
    /// subdirectory (or a name that isn't valid UTF-8).
    pub fn top_level_name(&self) -> Option<&str> {
        let mut components = self.path.components();
        let first = components.next()?;
        if components.next().is_some() {
            return None;
        }
        Path::new(first.as_os_str()).to_str()
    }
}
