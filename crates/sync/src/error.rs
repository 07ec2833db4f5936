//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Child errors from the feed and
//! storage crates are kept as children in the error tree via `or_raise`.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A reconciliation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every kind except [`NotFound`](ErrorKind::NotFound) aborts the cycle it
/// happens in; the previous snapshot stays authoritative.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The feed could not be fetched or parsed.
    #[display("could not fetch feed")]
    Fetch,
    /// No index file exists yet (first run).
    #[display("index file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The index file exists but isn't a valid snapshot.
    #[display("could not decode index file: {}", _0.display())]
    Decode(#[error(not(source))] PathBuf),
    /// A cover could not be obtained.
    #[display("could not download {url}: {reason}")]
    Download { url: String, reason: String },
    /// The snapshot could not be written.
    #[display("could not store index file: {}", _0.display())]
    Store(#[error(not(source))] PathBuf),
    /// Listing, reading, hashing or removing files in the save directory
    /// failed.
    #[display("file system error in save directory")]
    FileSystem,
    /// A cached cover could not be hashed.
    #[display("could not hash {}", _0.display())]
    Hash(#[error(not(source))] PathBuf),
    /// The public URL can't have path segments appended (`mailto:` and the
    /// like). Configuration validation rejects these, so only a hand-built
    /// [`AssetSync`](crate::AssetSync) can hit it.
    #[display("public URL cannot be used as a base: {_0}")]
    PublicUrl(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying (on the next cycle) might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch | Self::Download { .. } | Self::FileSystem | Self::Hash(_))
    }

    pub(crate) fn download(url: &str, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
