//! Where entries come from.

use crate::error::{ErrorKind, Result};
use crate::models::Entry;
use crate::parse::parse_channel;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;

/// Transport failures are retried this many times before giving up.
const RETRIES: u32 = 3;
const RETRY_WAIT: Duration = Duration::from_millis(100);

/// Produces the full, ordered list of entries currently in the feed.
///
/// Implementations must return entries with empty derived fields; the
/// reconciler is the only thing that ever fills them in.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable identity of the feed, for logging.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Vec<Entry>>;
}

/// The public interests feed of a single Douban user.
pub struct DoubanFeed {
    client: Client,
    url: String,
}
impl DoubanFeed {
    /// Build a feed client for the given user ID.
    ///
    /// # Errors
    /// Returns [`Client`](ErrorKind::Client) if the HTTP client can't be
    /// constructed (e.g. the user agent isn't a valid header value).
    pub fn new(feed_id: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self::with_client(client, Self::url_for(feed_id)))
    }

    /// Use a pre-built client against an arbitrary feed URL.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    pub fn url_for(feed_id: &str) -> String {
        format!("https://www.douban.com/feed/people/{feed_id}/interests")
    }

    async fn fetch_body(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/xml")
            .send()
            .await
            .or_raise(|| ErrorKind::Request(self.url.clone()))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Request(self.url.clone()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl FeedSource for DoubanFeed {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<Entry>> {
        let mut attempt = 0;
        let body = loop {
            match self.fetch_body().await {
                Ok(body) => break body,
                Err(e) if e.is_retryable() && attempt < RETRIES => {
                    attempt += 1;
                    tracing::warn!(url = %self.url, attempt, error = ?e, "Feed request failed; retrying");
                    tokio::time::sleep(RETRY_WAIT * attempt).await;
                },
                Err(e) => return Err(e),
            }
        };
        let entries = parse_channel(&body, &self.url)?;
        tracing::debug!(url = %self.url, entries = entries.len(), "Fetched feed");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = include_str!("../tests/support/interests.xml");

    fn feed(server: &mockito::Server) -> DoubanFeed {
        let client = Client::builder().timeout(Duration::from_secs(5)).build().unwrap();
        DoubanFeed::with_client(client, format!("{}/feed", server.url()))
    }

    #[test]
    fn test_url_for() {
        assert_eq!(DoubanFeed::url_for("157489011"), "https://www.douban.com/feed/people/157489011/interests");
    }

    #[test]
    fn test_describe() {
        let feed = DoubanFeed::new("157489011", "shelf-test", Duration::from_secs(1)).unwrap();
        assert_eq!(feed.describe(), DoubanFeed::url_for("157489011"));
    }

    #[test]
    fn test_invalid_user_agent() {
        let err = DoubanFeed::new("1", "bad\nagent", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Client));
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_request_error() {
        // Port 9 (discard) on localhost is closed in any sane test environment.
        let client = Client::builder().timeout(Duration::from_millis(200)).build().unwrap();
        let feed = DoubanFeed::with_client(client, "http://127.0.0.1:9/feed");
        let err = feed.fetch().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Request(_)));
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .match_header("accept", "application/xml")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let entries = feed(&server).fetch().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject_id, 1830528);
        assert_eq!(entries[1].rating, 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let unavailable = server
            .mock("GET", "/feed")
            .match_header("accept", "application/xml")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/feed")
            .match_header("accept", "application/xml")
            .with_status(200)
            .with_body(FEED)
            .expect(1)
            .create_async()
            .await;

        let entries = feed(&server).fetch().await.unwrap();
        assert_eq!(entries.len(), 2);
        unavailable.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_give_up_after_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .with_status(429)
            .expect(1 + RETRIES as usize)
            .create_async()
            .await;

        let err = feed(&server).fetch().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Status { status: 429, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/feed").with_status(404).expect(1).create_async().await;

        let err = feed(&server).fetch().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Status { status: 404, url } if url.ends_with("/feed")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_rss_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/feed").with_status(200).with_body("<html></html>").create_async().await;

        let err = feed(&server).fetch().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
    }
}
