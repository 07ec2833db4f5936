//! Fetching cover images over HTTP.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use reqwest::Client;
use shelf_config::Config;
use shelf_storage::ByteStream;
use std::time::Duration;

/// An in-flight response: status and advertised length are known, the body
/// has not been read yet.
pub struct Download {
    pub status: u16,
    /// The `Content-Length` header, if the server sent one.
    pub content_length: Option<u64>,
    pub body: ByteStream<'static>,
}

impl Download {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Starts a GET request for a cover image.
///
/// Implementations only fail for transport problems; judging the status and
/// length is up to the caller.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn get(&self, url: &str) -> Result<Download>;
}

/// [`Downloader`] backed by a shared [`reqwest::Client`].
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .or_raise(|| ErrorKind::download("(client)", "could not build HTTP client"))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.user_agent, config.timeout)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn get(&self, url: &str) -> Result<Download> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .or_raise(|| ErrorKind::download(url, "request failed"))?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        tracing::trace!(url, status, content_length, "Received cover response");
        Ok(Download {
            status,
            content_length,
            body: Box::pin(
                response
                    .bytes_stream()
                    .map_ok(|chunk| chunk.to_vec())
                    .map_err(std::io::Error::other),
            ),
        })
    }
}
