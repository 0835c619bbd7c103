use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::analysis::TextAnalyzer;
use crate::archive::{ArchiveClient, ArchiveError};
use crate::error::{ApiError, Result};
use crate::pagination::{self, PaginationError, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use crate::response::{
    BookContentPage, BookMetadataRef, ContentRequest, HealthResponse, RootResponse,
};

const INVALID_REQUEST: &str = "Invalid request. Please check the book ID and try again.";
const SOMETHING_WENT_WRONG: &str = "Something went wrong";

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Clients used by the handlers, built once at startup
pub struct AppState {
    pub archive: ArchiveClient,
    pub analyzer: TextAnalyzer,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1000))]
    pub page_size: u64,
}

fn default_page() -> u64 {
    DEFAULT_PAGE
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::PageNotFound => ApiError::PageNotFound,
            PaginationError::InvalidParameters => ApiError::ValidationError(err.to_string()),
        }
    }
}

/// Map archive failures onto API errors with per-endpoint wording
fn archive_error(err: ArchiveError, not_found: String, unavailable: &str) -> ApiError {
    match err {
        ArchiveError::NotFound(_) => ApiError::NotFound(not_found),
        ArchiveError::BadStatus(_) => ApiError::BadRequest(INVALID_REQUEST.to_string()),
        ArchiveError::Transport(_) => ApiError::UpstreamUnavailable(unavailable.to_string()),
    }
}

/// Liveness payload
pub async fn root() -> impl IntoResponse {
    Json(RootResponse::default())
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

/// Fetch one page of a book's plain text
pub async fn fetch_book_content(
    State(state): State<SharedState>,
    path: std::result::Result<Path<u64>, PathRejection>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<BookContentPage>> {
    let Path(book_id) = path?;
    let Query(query) = query?;
    query
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let content = state.archive.fetch_content(book_id).await.map_err(|e| {
        archive_error(
            e,
            format!("Book with ID {} not found.", book_id),
            "Failed to connect to Project Gutenberg.",
        )
    })?;

    let page = pagination::paginate(&content, query.page, query.page_size)?;

    Ok(Json(BookContentPage::new(
        book_id,
        query.page,
        query.page_size,
        page,
    )))
}

/// Resolve the catalogue page URL of a book
pub async fn fetch_book_metadata(
    State(state): State<SharedState>,
    path: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<BookMetadataRef>> {
    let Path(book_id) = path?;
    let metadata = state.archive.fetch_metadata(book_id).await.map_err(|e| {
        archive_error(
            e,
            format!("No metadata found for Book with ID {}.", book_id),
            SOMETHING_WENT_WRONG,
        )
    })?;

    Ok(Json(BookMetadataRef { book_id, metadata }))
}

/// Run every analysis prompt over the submitted text
pub async fn book_text_analysis(
    State(state): State<SharedState>,
    path: std::result::Result<Path<u64>, PathRejection>,
    payload: std::result::Result<Json<ContentRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Path(book_id) = path?;
    let Json(payload) = payload?;
    let result = state
        .analyzer
        .analyze_book(book_id, &payload.content)
        .await
        .map_err(|_| ApiError::UpstreamUnavailable(SOMETHING_WENT_WRONG.to_string()))?;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_minimums() {
        let ok = PageQuery {
            page: 1,
            page_size: 1000,
        };
        assert!(ok.validate().is_ok());

        let bad_page = PageQuery {
            page: 0,
            page_size: 1000,
        };
        assert!(bad_page.validate().is_err());

        let bad_size = PageQuery {
            page: 1,
            page_size: 999,
        };
        assert!(bad_size.validate().is_err());
    }

    #[test]
    fn test_archive_error_wording() {
        let err = archive_error(ArchiveError::NotFound(9), "missing 9".to_string(), "down");
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "missing 9"));

        let err = archive_error(
            ArchiveError::BadStatus(reqwest::StatusCode::FORBIDDEN),
            "missing".to_string(),
            "down",
        );
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == INVALID_REQUEST));
    }
}
