//! Deciding whether a freshly fetched feed differs from the stored snapshot,
//! and bringing the save directory up to date when it does.

use crate::assets::AssetSync;
use crate::download::Downloader;
use crate::error::{ErrorKind, Result};
use crate::prune::Pruner;
use crate::snapshot::SnapshotStore;
use exn::ResultExt;
use shelf_config::Config;
use shelf_feed::{Entry, FeedSource};
use shelf_storage::BackendHandle;
use std::sync::Arc;
use tracing::instrument;

/// Whether two entries agree on everything the feed provides. The derived
/// cover fields are not compared.
pub fn same_feed_fields(a: &Entry, b: &Entry) -> bool {
    a.subject_id == b.subject_id
        && a.title == b.title
        && a.cover_source_url == b.cover_source_url
        && a.link == b.link
        && a.category == b.category
        && a.status == b.status
        && a.rating == b.rating
        && a.pub_date == b.pub_date
}

/// Position-by-position comparison; a reordered feed counts as changed.
pub fn unchanged(fetched: &[Entry], stored: &[Entry]) -> bool {
    fetched.len() == stored.len() && fetched.iter().zip(stored).all(|(a, b)| same_feed_fields(a, b))
}

/// Outcome of one [`Reconciler::run_cycle()`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Whether a new snapshot was written.
    pub changed: bool,
    /// Files the pruner deleted.
    pub removed: Vec<String>,
}

pub struct Reconciler {
    store: SnapshotStore,
    assets: AssetSync,
    pruner: Pruner,
}

impl Reconciler {
    pub fn new(store: SnapshotStore, assets: AssetSync, pruner: Pruner) -> Self {
        Self { store, assets, pruner }
    }

    /// Wire up all three collaborators against one backend.
    pub fn from_config(config: &Config, backend: BackendHandle, downloader: Arc<dyn Downloader>) -> Self {
        let index = config.index_file_name.as_str();
        Self::new(
            SnapshotStore::new(backend.clone(), index),
            AssetSync::new(backend.clone(), downloader, config.public_url.clone(), index),
            Pruner::new(backend, index),
        )
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Compare `entries` with the stored snapshot and, if they differ, cache
    /// their covers and persist them. Returns whether anything was written.
    ///
    /// Nothing is written when the entries are unchanged. A missing index
    /// counts as a change; a corrupt one is an error.
    pub async fn reconcile(&self, mut entries: Vec<Entry>) -> Result<bool> {
        match self.store.load_existing().await? {
            Some(stored) if unchanged(&entries, &stored) => {
                tracing::info!(entries = entries.len(), "No change since the last snapshot");
                return Ok(false);
            },
            Some(stored) => {
                tracing::info!(stored = stored.len(), fetched = entries.len(), "Feed changed");
            },
            None => {
                tracing::info!(path = %self.store.index().display(), fetched = entries.len(), "No previous snapshot");
            },
        }

        self.assets.ensure(&mut entries).await?;
        self.store.save(&entries).await?;
        tracing::info!(entries = entries.len(), "Snapshot updated");
        Ok(true)
    }

    /// Remove files not referenced by the snapshot currently on disk.
    pub async fn prune(&self) -> Result<Vec<String>> {
        match self.store.load_existing().await? {
            Some(snapshot) => self.pruner.sweep(&snapshot).await,
            None => {
                tracing::debug!("No snapshot on disk; nothing to prune");
                Ok(Vec::new())
            },
        }
    }

    /// Fetch, reconcile, then prune.
    #[instrument(skip_all, fields(feed = %feed.describe()))]
    pub async fn run_cycle(&self, feed: &dyn FeedSource) -> Result<CycleReport> {
        let entries = feed.fetch().await.or_raise(|| ErrorKind::Fetch)?;
        let changed = self.reconcile(entries).await?;
        let removed = self.prune().await?;
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "Pruned unreferenced files");
        }
        Ok(CycleReport { changed, removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::HttpDownloader;
    use crate::testing::{COVER_BASE, FakeDownloader, FakeFeed, FakeResponse, cover_bytes, entry};
    use rstest::rstest;
    use shelf_storage::backend::{LocalBackend, MockBackend};
    use shelf_storage::digest_bytes;
    use std::path::PathBuf;
    use url::Url;

    fn reconciler(backend: BackendHandle, downloader: Arc<FakeDownloader>) -> Reconciler {
        Reconciler::new(
            SnapshotStore::new(backend.clone(), "index.json"),
            AssetSync::new(
                backend.clone(),
                downloader,
                Url::parse("http://127.0.0.1:8080/").unwrap(),
                "index.json",
            ),
            Pruner::new(backend, "index.json"),
        )
    }

    fn serving(covers: &[&str]) -> Arc<FakeDownloader> {
        let downloader = covers
            .iter()
            .enumerate()
            .fold(FakeDownloader::default(), |d, (i, cover)| d.serve(cover, cover_bytes(i as u8)));
        Arc::new(downloader)
    }

    #[rstest]
    #[case::title(|e: &mut Entry| e.title.push('!'))]
    #[case::cover(|e: &mut Entry| e.cover_source_url.push_str("?v=2"))]
    #[case::link(|e: &mut Entry| e.link.push('x'))]
    #[case::rating(|e: &mut Entry| e.rating = 5)]
    #[case::status(|e: &mut Entry| e.status = shelf_feed::Status::Now)]
    #[case::category(|e: &mut Entry| e.category = shelf_feed::Category::Music)]
    #[case::pub_date(|e: &mut Entry| e.pub_date += 1)]
    #[case::subject_id(|e: &mut Entry| e.subject_id += 1)]
    fn test_feed_field_difference(#[case] change: fn(&mut Entry)) {
        let a = entry(1, "p1.jpg");
        let mut b = a.clone();
        change(&mut b);
        assert!(!same_feed_fields(&a, &b));
    }

    #[test]
    fn test_derived_fields_are_ignored() {
        let a = entry(1, "p1.jpg");
        let mut b = a.clone();
        b.ext_cover_url = "http://127.0.0.1:8080/p1.jpg".to_string();
        b.ext_cover_hash = digest_bytes(b"cover");
        assert!(same_feed_fields(&a, &b));
        assert!(unchanged(&[a], &[b]));
    }

    #[test]
    fn test_order_and_length_matter() {
        let (a, b) = (entry(1, "p1.jpg"), entry(2, "p2.jpg"));
        assert!(unchanged(&[a.clone(), b.clone()], &[a.clone(), b.clone()]));
        assert!(!unchanged(&[a.clone(), b.clone()], &[b.clone(), a.clone()]));
        assert!(!unchanged(&[a.clone()], &[a.clone(), b]));
        assert!(unchanged(&[], &[]));
    }

    #[tokio::test]
    async fn test_first_run_writes_snapshot() {
        let backend = Arc::new(MockBackend::default());
        let downloader = serving(&["p1.jpg"]);
        let reconciler = reconciler(backend.clone(), downloader.clone());

        assert!(reconciler.reconcile(vec![entry(1, "p1.jpg")]).await.unwrap());
        let stored = reconciler.store().load().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].ext_cover_url, "http://127.0.0.1:8080/p1.jpg");
        assert_eq!(stored[0].ext_cover_hash, digest_bytes(cover_bytes(0)));
    }

    #[tokio::test]
    async fn test_second_reconcile_is_idempotent() {
        let backend = Arc::new(MockBackend::default());
        let downloader = serving(&["p1.jpg", "p2.jpg"]);
        let reconciler = reconciler(backend.clone(), downloader.clone());
        let entries = vec![entry(1, "p1.jpg"), entry(2, "p2.jpg")];

        assert!(reconciler.reconcile(entries.clone()).await.unwrap());
        let mutations = backend.mutations();
        let requests = downloader.requests().len();

        assert!(!reconciler.reconcile(entries).await.unwrap());
        assert_eq!(backend.mutations(), mutations);
        assert_eq!(downloader.requests().len(), requests);
    }

    #[tokio::test]
    async fn test_reorder_is_a_change() {
        let backend = Arc::new(MockBackend::default());
        let downloader = serving(&["p1.jpg", "p2.jpg"]);
        let reconciler = reconciler(backend.clone(), downloader.clone());

        reconciler.reconcile(vec![entry(1, "p1.jpg"), entry(2, "p2.jpg")]).await.unwrap();
        assert!(reconciler.reconcile(vec![entry(2, "p2.jpg"), entry(1, "p1.jpg")]).await.unwrap());
        let stored = reconciler.store().load().await.unwrap();
        assert_eq!(stored.iter().map(|e| e.subject_id).collect::<Vec<_>>(), vec![2, 1]);
        // Both covers were already cached.
        assert_eq!(downloader.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_index_is_an_error() {
        let backend = Arc::new(MockBackend::with_files([("index.json", "garbage")]));
        let reconciler = reconciler(backend.clone(), serving(&["p1.jpg"]));
        let err = reconciler.reconcile(vec![entry(1, "p1.jpg")]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
        assert_eq!(backend.mutations(), 0);
    }

    #[tokio::test]
    async fn test_download_failure_keeps_previous_snapshot() {
        let backend = Arc::new(MockBackend::default());
        let downloader = Arc::new(FakeDownloader::default().serve("p1.jpg", cover_bytes(1)).respond(
            "p2.jpg",
            FakeResponse {
                status: 200,
                content_length: Some(500),
                body: vec![0; 500],
            },
        ));
        let reconciler = reconciler(backend.clone(), downloader);

        reconciler.reconcile(vec![entry(1, "p1.jpg")]).await.unwrap();
        let before = reconciler.store().load().await.unwrap();

        let err = reconciler.reconcile(vec![entry(1, "p1.jpg"), entry(2, "p2.jpg")]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Download { .. }));
        assert_eq!(reconciler.store().load().await.unwrap(), before);
        assert!(!backend.paths().await.contains(&PathBuf::from("p2.jpg")));
    }

    #[tokio::test]
    async fn test_cycle_fetch_failure() {
        let backend = Arc::new(MockBackend::default());
        let reconciler = reconciler(backend.clone(), serving(&[]));
        let err = reconciler.run_cycle(&FakeFeed(None)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Fetch));
        assert_eq!(backend.mutations(), 0);
    }

    #[tokio::test]
    async fn test_prune_without_snapshot_is_noop() {
        let backend = Arc::new(MockBackend::with_files([("stray.jpg", cover_bytes(1))]));
        let reconciler = reconciler(backend.clone(), serving(&[]));
        assert!(reconciler.prune().await.unwrap().is_empty());
        assert_eq!(backend.paths().await, vec![PathBuf::from("stray.jpg")]);
    }

    /// Three cycles against a real directory: initial sync, no-op, then one
    /// entry replaced by another.
    #[tokio::test]
    async fn test_three_cycles_end_to_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend: BackendHandle = Arc::new(LocalBackend::new("local", temp_dir.path()).unwrap());
        let downloader = Arc::new(
            FakeDownloader::default()
                .serve("s1.jpg", cover_bytes(1))
                .serve("s2.jpg", cover_bytes(2))
                .serve("s3.jpg", cover_bytes(3)),
        );
        let reconciler = reconciler(backend.clone(), downloader.clone());

        // A stray file that will never be referenced.
        std::fs::write(temp_dir.path().join("stray.txt"), b"left over").unwrap();

        let first = FakeFeed(Some(vec![entry(1, "s1.jpg"), entry(2, "s2.jpg")]));
        let report = reconciler.run_cycle(&first).await.unwrap();
        assert!(report.changed);
        assert_eq!(report.removed, vec!["stray.txt"]);
        assert_eq!(downloader.requests().len(), 2);
        let stored = reconciler.store().load().await.unwrap();
        assert!(stored.iter().all(Entry::is_resolved));
        assert_eq!(stored[1].ext_cover_hash, digest_bytes(cover_bytes(2)));
        assert_eq!(stored[1].ext_cover_url, "http://127.0.0.1:8080/s2.jpg");

        let report = reconciler.run_cycle(&first).await.unwrap();
        assert_eq!(report, CycleReport::default());
        assert_eq!(downloader.requests().len(), 2);

        let third = FakeFeed(Some(vec![entry(1, "s1.jpg"), entry(3, "s3.jpg")]));
        let report = reconciler.run_cycle(&third).await.unwrap();
        assert!(report.changed);
        assert_eq!(report.removed, vec!["s2.jpg"]);
        assert_eq!(downloader.requests(), vec![
            format!("{COVER_BASE}/s1.jpg"),
            format!("{COVER_BASE}/s2.jpg"),
            format!("{COVER_BASE}/s3.jpg"),
        ]);

        let mut names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["index.json", "s1.jpg", "s3.jpg"]);
        let stored = reconciler.store().load().await.unwrap();
        assert_eq!(stored.iter().map(|e| e.subject_id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(stored[1].ext_cover_hash, digest_bytes(cover_bytes(3)));
    }

    #[tokio::test]
    async fn test_cycle_leaves_subdirectories_alone() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend: BackendHandle = Arc::new(LocalBackend::new("local", temp_dir.path()).unwrap());
        let reconciler = reconciler(backend, serving(&["s1.jpg"]));
        let nested = temp_dir.path().join("keep").join("deeper");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("important.txt"), b"do not touch").unwrap();
        std::fs::create_dir(temp_dir.path().join("empty")).unwrap();
        std::fs::write(temp_dir.path().join("stray.jpg"), b"old").unwrap();

        let report = reconciler.run_cycle(&FakeFeed(Some(vec![entry(1, "s1.jpg")]))).await.unwrap();
        assert_eq!(report.removed, vec!["stray.jpg"]);
        assert_eq!(std::fs::read(nested.join("important.txt")).unwrap(), b"do not touch");
        assert!(temp_dir.path().join("empty").is_dir());
    }

    /// Covers served over real HTTP: a short `Content-Length` aborts the
    /// cycle before anything is written for that cover or the snapshot.
    #[tokio::test]
    async fn test_short_http_cover_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let good = server.mock("GET", "/s1.jpg").with_body(cover_bytes(1)).expect(1).create_async().await;
        let short = server.mock("GET", "/s2.jpg").with_body(vec![0u8; 500]).expect(1).create_async().await;

        let temp_dir = tempfile::tempdir().unwrap();
        let backend: BackendHandle = Arc::new(LocalBackend::new("local", temp_dir.path()).unwrap());
        let downloader = Arc::new(HttpDownloader::new("shelf-test", std::time::Duration::from_secs(5)).unwrap());
        let reconciler = Reconciler::new(
            SnapshotStore::new(backend.clone(), "index.json"),
            AssetSync::new(backend.clone(), downloader, Url::parse("http://127.0.0.1:8080/").unwrap(), "index.json"),
            Pruner::new(backend, "index.json"),
        );
        let entries: Vec<Entry> = ["s1.jpg", "s2.jpg"]
            .iter()
            .zip(1..)
            .map(|(cover, id)| Entry {
                cover_source_url: format!("{}/{cover}", server.url()),
                ..entry(id, cover)
            })
            .collect();

        let err = reconciler.run_cycle(&FakeFeed(Some(entries))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Download { reason, .. } if reason.contains("500")));
        assert_eq!(std::fs::read(temp_dir.path().join("s1.jpg")).unwrap(), cover_bytes(1));
        assert!(!temp_dir.path().join("s2.jpg").exists());
        assert!(!temp_dir.path().join("index.json").exists());
        good.assert_async().await;
        short.assert_async().await;
    }
}
