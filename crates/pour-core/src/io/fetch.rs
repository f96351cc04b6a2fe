//! Artifact download.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::Client;

use crate::USER_AGENT;
use crate::error::{Error, Result};

/// Downloads release artifacts.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Return the raw bytes behind `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchError`] if the artifact cannot be retrieved.
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// HTTP(S) fetcher. `file://` URLs are read from disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchError`] if the TLS backend fails to initialize.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::FetchError(e.to_string()))?;
        Ok(Self { client })
    }

    /// Reuse an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_http(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::FetchError(format!("{url}: {e}")))?;

        let mut body = BytesMut::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::FetchError(format!("{url}: {e}")))?;
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        if let Some(path) = url.strip_prefix("file://") {
            tracing::debug!("Reading local artifact {path}");
            return tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| Error::FetchError(format!("{url}: {e}")));
        }

        tracing::debug!("GET {url}");
        self.fetch_http(url).await
    }
}

/// Fetch `url`, failing with [`Error::TransportTimeout`] once `timeout` elapses.
///
/// # Errors
///
/// Propagates the fetcher's error, or returns a retriable timeout.
pub async fn fetch_with_timeout<F>(fetcher: &F, url: &str, timeout: Duration) -> Result<Bytes>
where
    F: ArtifactFetcher + ?Sized,
{
    tokio::time::timeout(timeout, fetcher.fetch(url))
        .await
        .map_err(|_| Error::TransportTimeout {
            operation: "fetch",
            secs: timeout.as_secs(),
        })?
}
