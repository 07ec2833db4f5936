//! In-memory storage backend for testing.

use super::{ByteStream, FileInfoStream};
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::StorageBackend;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self`. Every mutating call is counted, which lets tests
/// assert that an operation performed no writes at all.
///
/// # Examples
///
/// ```
/// use shelf_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("index.json", b"[]")]);
/// assert_eq!(backend.stat(Path::new("index.json")).await?.size, 2);
///
/// backend.write(Path::new("s1.jpg"), b"data...").await?;
/// assert_eq!(backend.mutations(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    mutations: std::sync::atomic::AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then the
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            mutations: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of write, delete and rename calls made so far.
    pub fn mutations(&self) -> usize {
        self.mutations.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Sorted list of every stored path, for assertions.
    pub async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.storage.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn not_found(path: PathBuf) -> exn::Exn<ErrorKind> {
        exn::Exn::from(ErrorKind::NotFound(path))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    /// Paths with more than one component count as files in a subdirectory
    /// and are left out, the same as on the local filesystem.
    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            // Copy out under the read lock so it isn't held across yields.
            let files: Vec<FileInfo> = self
                .storage
                .read()
                .await
                .iter()
                .map(|(path, data)| FileInfo::new(path.clone(), data.len() as u64))
                .filter(|info| info.top_level_name().is_some())
                .collect();
            for info in files {
                yield Ok(info);
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        self.storage.read().await.get(&path).cloned().ok_or_else(|| Self::not_found(path))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.mutated();
        self.storage.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn write_stream(&self, path: &Path, chunks: ByteStream<'_>) -> Result<u64> {
        let path = validate_path(path)?;
        self.mutated();
        let data: Vec<u8> = chunks
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(ErrorKind::Io)?;
        let written = data.len() as u64;
        self.storage.write().await.insert(path, data);
        Ok(written)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.mutated();
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| Self::not_found(path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        self.mutated();
        let mut guard = self.storage.write().await;
        let data = guard.remove(&from).ok_or_else(|| Self::not_found(from))?;
        guard.insert(to, data);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let data = guard.get(&path).ok_or_else(|| Self::not_found(path.clone()))?;
        Ok(FileInfo::new(path.clone(), data.len() as u64))
    }
}
