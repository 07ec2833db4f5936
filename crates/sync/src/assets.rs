//! Cover image cache.
//!
//! Each entry's cover is stored in the save directory under the last path
//! segment of its source URL. A cached file is trusted only if it is larger
//! than [`MIN_ASSET_SIZE`]; anything smaller is treated as a broken earlier
//! download, removed, and fetched again.

use crate::download::Downloader;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_feed::Entry;
use shelf_storage::{BackendHandle, digest};
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Covers at or below this many bytes are considered broken.
pub const MIN_ASSET_SIZE: u64 = 1024;

/// What happened to a single entry's cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOutcome {
    /// A usable file was already present; nothing was fetched.
    Cached,
    /// The cover was fetched and written.
    Downloaded(u64),
    /// The entry has no usable cover file name.
    Skipped,
}

/// Makes sure every entry's cover exists locally and fills in the derived
/// cover fields from what's on disk.
pub struct AssetSync {
    backend: BackendHandle,
    downloader: Arc<dyn Downloader>,
    public_url: Url,
    index_file_name: String,
}

impl AssetSync {
    pub fn new(
        backend: BackendHandle,
        downloader: Arc<dyn Downloader>,
        public_url: Url,
        index_file_name: &str,
    ) -> Self {
        Self {
            backend,
            downloader,
            public_url,
            index_file_name: index_file_name.to_string(),
        }
    }

    /// Ensure every cover is cached, then resolve the derived fields.
    ///
    /// Stops at the first cover that can't be obtained. Covers already
    /// written stay on disk and are reused on the next attempt.
    pub async fn ensure(&self, entries: &mut [Entry]) -> Result<()> {
        let mut downloaded = 0;
        for entry in entries.iter() {
            if let AssetOutcome::Downloaded(_) = self.ensure_one(entry).await? {
                downloaded += 1;
            }
        }
        let resolved = self.resolve(entries).await?;
        tracing::info!(entries = entries.len(), downloaded, resolved, "Covers synchronised");
        Ok(())
    }

    /// Ensure a single entry's cover is cached.
    pub async fn ensure_one(&self, entry: &Entry) -> Result<AssetOutcome> {
        let Some(name) = self.asset_name(entry) else {
            tracing::warn!(
                subject_id = entry.subject_id,
                url = %entry.cover_source_url,
                "Entry has no usable cover file name; skipping"
            );
            return Ok(AssetOutcome::Skipped);
        };
        let path = Path::new(name);

        match self.backend.stat(path).await {
            Ok(info) if info.size > MIN_ASSET_SIZE => {
                tracing::trace!(path = %path.display(), size = info.size, "Cover already cached");
                return Ok(AssetOutcome::Cached);
            },
            Ok(info) => {
                tracing::warn!(path = %path.display(), size = info.size, "Cached cover is too small; fetching again");
                self.backend.delete(path).await.or_raise(|| ErrorKind::FileSystem)?;
            },
            Err(e) if e.is_not_found() => {},
            Err(e) => return Err(e).or_raise(|| ErrorKind::FileSystem),
        }

        let url = entry.cover_source_url.trim();
        let download = self.downloader.get(url).await?;
        if !download.is_success() {
            exn::bail!(ErrorKind::download(url, format!("unexpected status code {}", download.status)));
        }
        let length = download.content_length.unwrap_or(0);
        if length < MIN_ASSET_SIZE {
            exn::bail!(ErrorKind::download(url, format!("content length {length} is too small")));
        }
        let written = self
            .backend
            .write_stream(path, download.body)
            .await
            .or_raise(|| ErrorKind::download(url, "could not write body"))?;
        tracing::info!(url, path = %path.display(), bytes = written, "Downloaded cover");
        Ok(AssetOutcome::Downloaded(written))
    }

    /// Fill in the derived cover fields of every entry whose cover file is
    /// present, clearing them on the rest. Returns the number resolved.
    pub async fn resolve(&self, entries: &mut [Entry]) -> Result<usize> {
        entries.iter_mut().for_each(Entry::clear_derived);
        let files = self.backend.list().await.or_raise(|| ErrorKind::FileSystem)?;

        let mut resolved = 0;
        for file in files {
            let Some(name) = file.top_level_name() else {
                continue;
            };
            if name == self.index_file_name {
                continue;
            }
            let matching: Vec<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| self.asset_name(entry) == Some(name))
                .map(|(i, _)| i)
                .collect();
            if matching.is_empty() {
                continue;
            }

            let url = self.public_url_for(name)?;
            let hash = digest(self.backend.as_ref(), &file.path)
                .await
                .or_raise(|| ErrorKind::Hash(file.path.clone()))?;
            for i in matching {
                entries[i].ext_cover_url = url.clone();
                entries[i].ext_cover_hash = hash.clone();
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    /// The cover's file name, unless it would collide with the index file.
    fn asset_name<'e>(&self, entry: &'e Entry) -> Option<&'e str> {
        entry.cover_file_name().filter(|name| *name != self.index_file_name)
    }

    /// `public_url` with `name` appended as a single path segment.
    pub fn public_url_for(&self, name: &str) -> Result<String> {
        let mut url = self.public_url.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorKind::PublicUrl(self.public_url.to_string()))?
            .pop_if_empty()
            .push(name);
        Ok(url.to_string())
    }
}
