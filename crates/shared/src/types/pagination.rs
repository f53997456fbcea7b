//! Offset pagination for entry listings.
//!
//! Pages are 1-based. `per_page` is clamped to `1..=MAX_PER_PAGE` when the
//! query is built, so an oversized request cannot pull a whole ledger.

use serde::{Deserialize, Serialize};

/// Largest page a listing will return.
pub const MAX_PER_PAGE: u32 = 200;

const DEFAULT_PER_PAGE: u32 = 25;

/// Which slice of a listing to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number; 0 is read as 1.
    #[serde(default = "first_page")]
    pub page: u32,
    /// Requested page size.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(first_page(), DEFAULT_PER_PAGE)
    }
}

impl PageRequest {
    /// Page `page` of `per_page` rows.
    #[must_use]
    pub const fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Page size actually used.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page.clamp(1, MAX_PER_PAGE))
    }

    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * self.limit()
    }
}

/// One page of results plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Effective page size.
    pub per_page: u32,
    /// Rows matching the query across all pages.
    pub total: u64,
    /// Number of pages; at least 1 so an empty listing still has a page.
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Wraps `items` fetched for `request` out of `total` matching rows.
    #[must_use]
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let per_page = request.limit();
        Self {
            items,
            page: request.page.max(1),
            // limit() is clamped to MAX_PER_PAGE
            per_page: u32::try_from(per_page).unwrap_or(MAX_PER_PAGE),
            total,
            total_pages: total.div_ceil(per_page).max(1),
        }
    }

    /// Returns true if a later page has rows.
    #[must_use]
    pub fn has_more(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
