//! Read-only storage backend.
//!
//! Wraps another backend for dry runs: reads pass through, every mutation is
//! logged and dropped while still reporting success.

use async_trait::async_trait;
use futures::TryStreamExt;
use std::path::Path;

use crate::backend::{ByteStream, FileInfoStream};
use crate::{BackendHandle, StorageBackend, error::Result, file::FileInfo};

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        self.inner.list_stream()
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(path = %path.display(), bytes = data.len(), "Skipping write during read-only mode");
        Ok(())
    }

    async fn write_stream(&self, path: &Path, chunks: ByteStream<'_>) -> Result<u64> {
        // Drain the stream so the caller still sees transport errors.
        let written = chunks
            .try_fold(0u64, |total, chunk| async move { Ok(total + chunk.len() as u64) })
            .await
            .map_err(crate::error::ErrorKind::Io)?;
        tracing::info!(path = %path.display(), bytes = written, "Skipping streamed write during read-only mode");
        Ok(written)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping delete during read-only mode");
        Ok(())
    }

    async fn rename(&self, from: &Path, _to: &Path) -> Result<()> {
        tracing::info!(path = %from.display(), "Skipping rename during read-only mode");
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path).await
    }
}
