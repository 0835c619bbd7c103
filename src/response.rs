use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Instant;

use crate::pagination::Page;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookContentPage {
    pub book_id: u64,
    pub content: String,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl BookContentPage {
    pub fn new(book_id: u64, page: u64, page_size: u64, slice: Page<'_>) -> Self {
        Self {
            book_id,
            content: slice.content.to_string(),
            page,
            page_size,
            total_pages: slice.total_pages,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookMetadataRef {
    pub book_id: u64,
    /// Resolved URL of the catalogue page
    pub metadata: String,
}

/// Raw model output for each analysis question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextAnalysisResult {
    pub book_id: u64,
    pub title_and_author: String,
    pub language: String,
    pub summary: String,
    pub key_characters: String,
    pub sentiment_analysis: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    #[serde(rename = "Message")]
    pub message: &'static str,
}

impl Default for RootResponse {
    fn default() -> Self {
        Self {
            message: "Project Gutenberg API",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: START_TIME.elapsed().as_secs(),
        }
    }
}

/// Start the uptime clock
pub fn mark_started() {
    LazyLock::force(&START_TIME);
}
