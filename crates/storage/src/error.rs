//! Storage Error Types
//!
//! Errors are `exn` frames over [`ErrorKind`], so callers in the sync crate
//! can `or_raise` them into their own kinds and keep the storage frame as a
//! child of the error tree.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong with a file in the save directory.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file isn't there. Callers usually treat this as a normal state
    /// (first run, cover not cached yet).
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Rejected by path validation: absolute, escaping the root, or
    /// containing a NUL byte.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Anything backend-specific that doesn't fit the kinds above.
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
