//! Fakes shared by the unit tests.

use crate::download::{Download, Downloader};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use shelf_feed::{Category, Entry, FeedSource, Status};
use std::collections::HashMap;
use std::sync::Mutex;

pub const COVER_BASE: &str = "https://img.example.com/view/photo/public";

/// A feed entry whose cover is served at `COVER_BASE/{cover}`.
pub fn entry(subject_id: u64, cover: &str) -> Entry {
    Entry {
        subject_id,
        title: format!("Subject {subject_id}"),
        cover_source_url: format!("{COVER_BASE}/{cover}"),
        link: format!("https://example.com/subject/{subject_id}/"),
        category: Category::Book,
        status: Status::Past,
        rating: 4,
        pub_date: 1_743_053_004 + subject_id as i64,
        ..Entry::default()
    }
}

/// Cover-sized body with a recognisable first byte.
pub fn cover_bytes(seed: u8) -> Vec<u8> {
    let mut bytes = vec![seed; 2048];
    bytes[0] = b'C';
    bytes
}

pub struct FakeResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

/// Serves canned responses by URL and records every request.
#[derive(Default)]
pub struct FakeDownloader {
    responses: HashMap<String, (u16, Option<u64>, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl FakeDownloader {
    /// Serve `body` with status 200 and an accurate content length.
    pub fn serve(mut self, cover: &str, body: Vec<u8>) -> Self {
        let length = body.len() as u64;
        self.responses.insert(format!("{COVER_BASE}/{cover}"), (200, Some(length), body));
        self
    }

    pub fn respond(mut self, cover: &str, response: FakeResponse) -> Self {
        self.responses.insert(
            format!("{COVER_BASE}/{cover}"),
            (response.status, response.content_length, response.body),
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn get(&self, url: &str) -> Result<Download> {
        self.requests.lock().unwrap().push(url.to_string());
        let Some((status, content_length, body)) = self.responses.get(url).cloned() else {
            exn::bail!(ErrorKind::download(url, "connection refused"));
        };
        Ok(Download {
            status,
            content_length,
            body: Box::pin(futures::stream::iter([Ok::<_, std::io::Error>(body)])),
        })
    }
}

/// A feed returning a fixed list, or failing when empty-handed.
pub struct FakeFeed(pub Option<Vec<Entry>>);

#[async_trait]
impl FeedSource for FakeFeed {
    fn describe(&self) -> String {
        "fake".to_string()
    }

    async fn fetch(&self) -> shelf_feed::error::Result<Vec<Entry>> {
        match &self.0 {
            Some(entries) => Ok(entries.clone()),
            None => exn::bail!(shelf_feed::error::ErrorKind::Request("fake".to_string())),
        }
    }
}
