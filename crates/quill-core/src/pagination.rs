//! Page-number pagination.
//!
//! Page numbers are 1-based. The number of pages is never below one, so the first
//! page of an empty listing is valid. Anything else outside `1..=num_pages`, or a
//! `page` value that is neither an integer nor `last`, is an invalid page.

use serde::Serialize;

/// Default number of posts per page.
pub const DEFAULT_PER_PAGE: u64 = 5;

/// Keyword selecting the final page.
pub const LAST_PAGE: &str = "last";

/// Reasons a requested page cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("Page is not an integer: {0}")]
    NotAnInteger(String),

    #[error("That page number is less than 1")]
    TooSmall,

    #[error("That page contains no results")]
    Empty,
}

/// Resolved slice of a listing: which page, and the offset/limit to fetch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub num_pages: u64,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// Resolves raw `page` parameters against a total item count.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl Paginator {
    /// A zero page size is treated as one.
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn num_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(self.per_page).max(1)
    }

    /// Validate `raw` (the unparsed `page` query value) for a listing of `total_items`.
    pub fn resolve(&self, raw: Option<&str>, total_items: u64) -> Result<PageRequest, PageError> {
        let num_pages = self.num_pages(total_items);

        let number = match raw.map(str::trim) {
            None | Some("") => 1,
            Some(LAST_PAGE) => num_pages,
            Some(value) => {
                let parsed: i64 = value
                    .parse()
                    .map_err(|_| PageError::NotAnInteger(value.to_string()))?;
                if parsed < 1 {
                    return Err(PageError::TooSmall);
                }
                parsed as u64
            }
        };

        if number > num_pages {
            return Err(PageError::Empty);
        }

        Ok(PageRequest {
            number,
            per_page: self.per_page,
            total_items,
            num_pages,
        })
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub num_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest) -> Self {
        let has_next = request.number < request.num_pages;
        let has_previous = request.number > 1;
        Self {
            items,
            number: request.number,
            per_page: request.per_page,
            total_items: request.total_items,
            num_pages: request.num_pages,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(request.number + 1),
            previous_page_number: has_previous.then(|| request.number - 1),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_items: self.total_items,
            num_pages: self.num_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }
}
