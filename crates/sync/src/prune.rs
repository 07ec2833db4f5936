use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_feed::Entry;
use shelf_storage::BackendHandle;
use std::collections::HashSet;

/// Removes files from the save directory that no snapshot entry references.
pub struct Pruner {
    backend: BackendHandle,
    index_file_name: String,
}

impl Pruner {
    pub fn new(backend: BackendHandle, index_file_name: &str) -> Self {
        Self {
            backend,
            index_file_name: index_file_name.to_string(),
        }
    }

    /// Delete every top-level file that is neither the index nor the cover of
    /// an entry in `snapshot`. Returns the removed paths, sorted.
    ///
    /// Subdirectories and anything inside them are left alone. An empty
    /// snapshot removes nothing.
    pub async fn sweep(&self, snapshot: &[Entry]) -> Result<Vec<String>> {
        if snapshot.is_empty() {
            tracing::debug!("Snapshot is empty; nothing to prune");
            return Ok(Vec::new());
        }
        let referenced: HashSet<&str> = snapshot.iter().filter_map(Entry::cover_file_name).collect();
        let files = self.backend.list().await.or_raise(|| ErrorKind::FileSystem)?;

        let mut removed = Vec::new();
        for file in files {
            let Some(name) = file.top_level_name() else {
                tracing::warn!(path = %file.path.display(), "Backend listed a nested file; leaving it");
                continue;
            };
            if name == self.index_file_name || referenced.contains(name) {
                continue;
            }
            tracing::info!(path = %file.path.display(), size = file.size, "Removing unreferenced file");
            self.backend.delete(&file.path).await.or_raise(|| ErrorKind::FileSystem)?;
            removed.push(file.path.display().to_string());
        }
        removed.sort();
        Ok(removed)
    }
}
