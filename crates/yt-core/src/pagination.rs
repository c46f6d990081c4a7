//! # Pagination
//!
//! Splits an ordered collection into fixed-size pages. A missing or
//! non-numeric page request yields the first page; an out-of-range request
//! (including zero and negative numbers) yields the last page. An empty
//! collection still has one (empty) page.

use serde::Serialize;

/// The slice of a collection a resolved page request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub limit: u64,
    pub offset: u64,
}

impl PageWindow {
    pub fn resolve(raw: Option<&str>, total: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);
        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n >= 1 && (n as u64) <= num_pages => n as u64,
            Some(Ok(_)) => num_pages,
        };
        Self {
            number,
            num_pages,
            limit: per_page,
            offset: (number - 1) * per_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub number: u64,
    pub is_current: bool,
}

/// One page of an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: u64) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total,
        }
    }

    /// The same page with each item borrowed and transformed.
    pub fn map_ref<'a, U>(&'a self, f: impl FnMut(&'a T) -> U) -> Page<U> {
        Page {
            items: self.items.iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.num_pages > 1
    }

    pub fn next_page_number(&self) -> u64 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn previous_page_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn links(&self) -> Vec<PageLink> {
        (1..=self.num_pages)
            .map(|number| PageLink {
                number,
                is_current: number == self.number,
            })
            .collect()
    }
}
