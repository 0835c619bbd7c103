//! Character-window pagination over fetched book text.
//!
//! Offsets and lengths count `char`s, so a page never splits a code point.

use thiserror::Error;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 15_000;
pub const MIN_PAGE_SIZE: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("Page not found.")]
    PageNotFound,

    #[error("page and page_size must be greater than 0")]
    InvalidParameters,
}

/// One window of content plus the page count for the whole text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    pub content: &'a str,
    pub total_pages: u64,
}

/// Slice `content` into the 1-based `page` of `page_size` characters.
pub fn paginate(content: &str, page: u64, page_size: u64) -> Result<Page<'_>, PaginationError> {
    if page == 0 || page_size == 0 {
        return Err(PaginationError::InvalidParameters);
    }

    let length = content.chars().count() as u64;
    let start = (page - 1).saturating_mul(page_size);
    if start >= length {
        return Err(PaginationError::PageNotFound);
    }
    let end = start.saturating_add(page_size).min(length);

    let start_byte = byte_offset(content, start);
    let end_byte = byte_offset(content, end);

    Ok(Page {
        content: &content[start_byte..end_byte],
        total_pages: length.div_ceil(page_size),
    })
}

fn byte_offset(content: &str, char_index: u64) -> usize {
    content
        .char_indices()
        .map(|(offset, _)| offset)
        .nth(char_index as usize)
        .unwrap_or(content.len())
}
