//! Keeps a local mirror of a feed: an index file holding the latest
//! snapshot of entries, and a cache of their cover images next to it.
//!
//! Each cycle fetches the feed, compares it with the stored snapshot, and
//! only when something changed downloads missing covers and rewrites the
//! index. Files no longer referenced by the snapshot are then pruned.

mod assets;
mod download;
pub mod error;
mod prune;
mod reconcile;
mod snapshot;
#[cfg(test)]
mod testing;

pub use crate::assets::{AssetOutcome, AssetSync, MIN_ASSET_SIZE};
pub use crate::download::{Download, Downloader, HttpDownloader};
pub use crate::prune::Pruner;
pub use crate::reconcile::{CycleReport, Reconciler, same_feed_fields, unchanged};
pub use crate::snapshot::SnapshotStore;
