//! Client for the remote book archive.
//!
//! Two lookups are supported: the plain-text body of a book and the resolved
//! URL of its catalogue page.

use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Fixed timeout for every archive request
pub const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("book {0} not found in archive")]
    NotFound(u64),

    #[error("archive responded with status {0}")]
    BadStatus(StatusCode),

    #[error("failed to reach archive: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ArchiveClient {
    base_url: String,
    client: Client,
}

impl ArchiveClient {
    pub fn new(base_url: &str) -> Result<Self, ArchiveError> {
        let client = ClientBuilder::new().timeout(ARCHIVE_TIMEOUT).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn content_url(&self, book_id: u64) -> String {
        format!("{}/files/{}/{}-0.txt", self.base_url, book_id, book_id)
    }

    pub fn metadata_url(&self, book_id: u64) -> String {
        format!("{}/ebooks/{}", self.base_url, book_id)
    }

    /// Fetch the full plain-text body of a book
    pub async fn fetch_content(&self, book_id: u64) -> Result<String, ArchiveError> {
        let response = self.get(book_id, &self.content_url(book_id)).await?;
        let text = response.text().await.map_err(|e| {
            warn!(book_id, error = %e, "Failed to read book content");
            ArchiveError::Transport(e)
        })?;

        debug!(book_id, bytes = text.len(), "Fetched book content");
        Ok(text)
    }

    /// Resolve the catalogue page of a book, following redirects
    pub async fn fetch_metadata(&self, book_id: u64) -> Result<String, ArchiveError> {
        let response = self.get(book_id, &self.metadata_url(book_id)).await?;
        Ok(response.url().to_string())
    }

    async fn get(&self, book_id: u64, url: &str) -> Result<reqwest::Response, ArchiveError> {
        debug!(book_id, url = %url, "Requesting archive");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(book_id, url = %url, error = %e, "Archive request failed");
            ArchiveError::Transport(e)
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ArchiveError::NotFound(book_id)),
            status if status.as_u16() >= 400 => {
                warn!(book_id, url = %url, status = %status, "Archive returned error status");
                Err(ArchiveError::BadStatus(status))
            }
            _ => Ok(response),
        }
    }
}
