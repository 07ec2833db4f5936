//! The persisted snapshot: a JSON array of entries in the save directory.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_feed::Entry;
use shelf_storage::BackendHandle;
use std::path::{Path, PathBuf};

/// Reads and atomically replaces the index file.
///
/// The file is written to a hidden sibling first and renamed over the index,
/// so readers (a web server, say) only ever see a complete snapshot.
pub struct SnapshotStore {
    backend: BackendHandle,
    index: PathBuf,
    staging: PathBuf,
}

impl SnapshotStore {
    pub fn new(backend: BackendHandle, index_file_name: &str) -> Self {
        Self {
            backend,
            index: PathBuf::from(index_file_name),
            staging: PathBuf::from(format!(".{index_file_name}.tmp")),
        }
    }

    /// Path of the index file, relative to the save directory.
    pub fn index(&self) -> &Path {
        &self.index
    }

    /// Load the current snapshot.
    ///
    /// # Errors
    /// - [`NotFound`](ErrorKind::NotFound) if no index file exists yet.
    /// - [`Decode`](ErrorKind::Decode) if the file isn't a JSON array of
    ///   entries. An empty array is valid.
    pub async fn load(&self) -> Result<Vec<Entry>> {
        let bytes = match self.backend.read(&self.index).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Err(e).or_raise(|| ErrorKind::NotFound(self.index.clone())),
            Err(e) => return Err(e).or_raise(|| ErrorKind::FileSystem),
        };
        serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Decode(self.index.clone()))
    }

    /// Like [`load()`](Self::load), but a missing index is `Ok(None)`.
    pub async fn load_existing(&self) -> Result<Option<Vec<Entry>>> {
        match self.load().await {
            Ok(entries) => Ok(Some(entries)),
            Err(e) if matches!(&*e, ErrorKind::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the snapshot with `entries`, in order.
    ///
    /// On failure the previous index file (if any) is left untouched.
    pub async fn save(&self, entries: &[Entry]) -> Result<()> {
        let json = serde_json::to_vec(entries).or_raise(|| ErrorKind::Store(self.index.clone()))?;
        self.backend
            .write(&self.staging, &json)
            .await
            .or_raise(|| ErrorKind::Store(self.index.clone()))?;
        if let Err(e) = self.backend.rename(&self.staging, &self.index).await {
            if let Err(cleanup) = self.backend.delete(&self.staging).await {
                tracing::warn!(path = %self.staging.display(), error = ?cleanup, "Could not remove staged index file");
            }
            return Err(e).or_raise(|| ErrorKind::Store(self.index.clone()));
        }
        tracing::debug!(
            backend = self.backend.name(),
            path = %self.index.display(),
            entries = entries.len(),
            bytes = json.len(),
            "Saved index file"
        );
        Ok(())
    }
}
