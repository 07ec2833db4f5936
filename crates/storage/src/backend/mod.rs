//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait: the small set of file
//! operations the snapshot store, asset sync and pruner need, so that the
//! same logic runs against the local save directory or an in-memory backend
//! in tests.

mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// A stream of body chunks, as produced by an HTTP response.
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = std::io::Result<Vec<u8>>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use shelf_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_cover(backend: &dyn StorageBackend) -> Result<u64> {
///     match backend.stat(Path::new("p2558480666.webp")).await {
///         Ok(info) => Ok(info.size),
///         Err(err) if err.is_not_found() => Ok(0),
///         Err(err) => Err(err),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Every file directly under the root, in no particular order.
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Stream metadata for the files directly under the root.
    ///
    /// Subdirectories are not descended into and are not yielded themselves,
    /// so nothing the caller does with the listing can reach nested files.
    fn list_stream(&self) -> FileInfoStream<'_>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or overwriting the file.
    ///
    /// Implementations should create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Write a stream of chunks to a file, returning the number of bytes
    /// written.
    ///
    /// If the stream fails part way through, the partially written file is
    /// removed before the error is returned.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use shelf_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let chunks = futures::stream::iter([Ok::<_, std::io::Error>(b"GIF89a".to_vec()), Ok(vec![0; 2048])]);
    /// let written = backend.write_stream(Path::new("cover.gif"), Box::pin(chunks)).await?;
    /// assert_eq!(written, 2054);
    /// # Ok(())
    /// # }
    /// ```
    async fn write_stream(&self, path: &Path, chunks: ByteStream<'_>) -> Result<u64>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename a file within the same backend, overwriting the destination.
    ///
    /// On the local filesystem this is atomic, which is what the snapshot
    /// store relies on.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
