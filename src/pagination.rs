//! Lazy loading of further catalog pages
//!
//! [`PaginationTrigger`] decides when to request the next page and enforces
//! that at most one page request is in flight. Live channel lists are loaded
//! as one complete set and never paginate.

use thiserror::Error;

/// Rows (or pixels, for a pointer-driven viewport) from the bottom that count
/// as "near the end" for continuous scrolling
pub const NEAR_BOTTOM_BUFFER: usize = 3;

/// True when `new_index` sits within the last visible row
pub fn should_fetch_more(new_index: usize, total_visible: usize, columns: usize) -> bool {
    new_index >= total_visible.saturating_sub(columns.max(1))
}

/// Proximity check for a continuously scrolled viewport
pub fn near_bottom(scroll_offset: usize, viewport: usize, content: usize) -> bool {
    scroll_offset + viewport + NEAR_BOTTOM_BUFFER >= content
}

/// A catalog request that failed, tagged with the page it was for
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Loading page {page} failed: {message}")]
pub struct FetchError {
    pub page: usize,
    pub message: String,
}

impl FetchError {
    pub fn new(page: usize, message: impl Into<String>) -> Self {
        Self {
            page,
            message: message.into(),
        }
    }

    /// A first-page failure replaces the whole view; later pages only show a
    /// banner over the items already loaded.
    pub fn is_blocking(&self) -> bool {
        self.page <= 1
    }
}

/// In-flight guard and end-of-list tracking for one listing
#[derive(Debug, Clone, Default)]
pub struct PaginationTrigger {
    live: bool,
    loaded_pages: usize,
    loaded_count: usize,
    total_count: Option<usize>,
    in_flight: Option<usize>,
    failed_page: Option<usize>,
}

impl PaginationTrigger {
    /// Fresh trigger for a listing. `live` disables paging entirely.
    pub fn new(live: bool) -> Self {
        Self {
            live,
            ..Self::default()
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    /// Page whose append request failed and awaits a manual retry
    pub fn failed_page(&self) -> Option<usize> {
        self.failed_page
    }

    /// Terminal page reached (only known when the server reports a total)
    pub fn is_exhausted(&self) -> bool {
        matches!(self.total_count, Some(total) if total > 0 && self.loaded_count >= total)
    }

    /// Whether an automatic append may be dispatched now
    pub fn can_fetch_more(&self) -> bool {
        !self.live
            && self.loaded_pages > 0
            && self.in_flight.is_none()
            && self.failed_page.is_none()
            && !self.is_exhausted()
    }

    /// Set the guard for the first page. Always allowed: a first-page request
    /// supersedes anything in flight for the previous listing.
    pub fn begin_first_page(&mut self) -> usize {
        *self = Self::new(self.live);
        self.in_flight = Some(1);
        1
    }

    /// Set the guard for the next page, if an append is allowed
    pub fn begin_next_page(&mut self) -> Option<usize> {
        if !self.can_fetch_more() {
            return None;
        }
        let page = self.loaded_pages + 1;
        self.in_flight = Some(page);
        Some(page)
    }

    /// Re-issue the page that failed to append
    pub fn begin_retry(&mut self) -> Option<usize> {
        if self.in_flight.is_some() {
            return None;
        }
        let page = self.failed_page.take()?;
        self.in_flight = Some(page);
        Some(page)
    }

    /// Record a successful response and clear the guard. Responses for a page
    /// that is not the one in flight are ignored.
    pub fn complete(&mut self, page: usize, received: usize, total: Option<usize>) -> bool {
        if self.in_flight != Some(page) {
            return false;
        }
        self.in_flight = None;
        self.failed_page = None;
        self.loaded_pages = page;
        self.loaded_count = if page <= 1 {
            received
        } else {
            self.loaded_count + received
        };
        if total.is_some() {
            self.total_count = total;
        }
        // An empty append means the server has nothing more
        if page > 1 && received == 0 {
            self.total_count = Some(self.loaded_count);
        }
        true
    }

    /// Record a failed response and clear the guard
    pub fn fail(&mut self, page: usize) -> bool {
        if self.in_flight != Some(page) {
            return false;
        }
        self.in_flight = None;
        if page > 1 {
            self.failed_page = Some(page);
        }
        true
    }
}
