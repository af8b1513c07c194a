use crate::{Result, SearchError};
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 30;

/// Number of pages needed for `total` items; zero when there is nothing to show.
#[must_use]
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Slice out 1-indexed page `page_number`.
pub fn page<T>(items: &[T], page_size: usize, page_number: usize) -> Result<&[T]> {
    if page_size == 0 {
        return Err(SearchError::InvalidPageSize);
    }
    let pages = page_count(items.len(), page_size);
    if page_number == 0 || page_number > pages {
        return Err(SearchError::PageOutOfRange {
            page: page_number,
            pages,
        });
    }
    let start = (page_number - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Ok(&items[start..end])
}

/// Current-page cursor over a result set. Re-bind with [`Pager::reset`] whenever the
/// underlying results are replaced.
#[derive(Debug, Clone, Serialize)]
pub struct Pager {
    page_size: usize,
    current: usize,
    total: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(SearchError::InvalidPageSize);
        }
        Ok(Self {
            page_size,
            current: 1,
            total: 0,
        })
    }

    /// Point at a new result set of `total` items, back on page 1.
    pub fn reset(&mut self, total: usize) {
        self.total = total;
        self.current = 1;
    }

    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        page_count(self.total, self.page_size)
    }

    pub fn next(&mut self) -> bool {
        if self.current < self.page_count() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `page`, clamped into `[1, page_count]`. Returns the page landed on.
    pub fn go_to(&mut self, page: usize) -> usize {
        self.current = page.clamp(1, self.page_count().max(1));
        self.current
    }

    /// Items of the current page; empty when `items` is empty.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page(items, self.page_size, self.current).unwrap_or(&[])
    }
}
