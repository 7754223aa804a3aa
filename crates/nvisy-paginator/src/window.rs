//! Page-number arithmetic for the navigation window.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Page numbers surrounding the current page of a result set.
///
/// Pure arithmetic: knows nothing about records or cursors. Pages are
/// 1-based; the record at the start of page `p` sits at offset
/// `(p - 1) * page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    current_page: u64,
    page_size: u64,
    button_count: u64,
    total_count: u64,
    total_pages: u64,
}

impl PageWindow {
    /// Creates a window for the given page.
    ///
    /// The current page is clamped into `1..=total_pages`; zero sizes are
    /// treated as one.
    pub fn new(current_page: u64, page_size: u32, button_count: u32, total_count: u64) -> Self {
        let page_size = u64::from(page_size.max(1));
        let total_pages = total_count.div_ceil(page_size);

        Self {
            current_page: current_page.clamp(1, total_pages.max(1)),
            page_size,
            button_count: u64::from(button_count.max(1)),
            total_count,
            total_pages,
        }
    }

    /// Returns the current page after clamping.
    #[inline]
    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Returns the number of pages.
    #[inline]
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Returns the number of records.
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Returns the offset of the first record of a page.
    #[inline]
    pub fn offset_of(&self, page: u64) -> u64 {
        page.saturating_sub(1) * self.page_size
    }

    /// Returns the first page, if any page exists.
    pub fn first(&self) -> Option<u64> {
        (self.total_pages > 0).then_some(1)
    }

    /// Returns the last page, if any page exists.
    pub fn last(&self) -> Option<u64> {
        (self.total_pages > 0).then_some(self.total_pages)
    }

    /// Returns the page before the current one.
    pub fn previous(&self) -> Option<u64> {
        (self.total_pages > 0 && self.current_page > 1).then(|| self.current_page - 1)
    }

    /// Returns the page after the current one.
    pub fn next(&self) -> Option<u64> {
        (self.current_page < self.total_pages).then(|| self.current_page + 1)
    }

    /// Returns the consecutive pages shown around the current one.
    ///
    /// The window holds `min(button_count, total_pages)` pages. It starts
    /// `button_count / 2` pages before the current page and is shifted
    /// toward page 1 instead of being cut off at the last page.
    pub fn around(&self) -> RangeInclusive<u64> {
        let len = self.button_count.min(self.total_pages);
        if len == 0 {
            return RangeInclusive::new(1, 0);
        }

        let mut start = self
            .current_page
            .saturating_sub(self.button_count / 2)
            .max(1);
        let mut end = start + len - 1;

        if end > self.total_pages {
            end = self.total_pages;
            start = end + 1 - len;
        }

        start..=end
    }

    /// Returns every page whose first record must be looked up to build
    /// the window's markers.
    pub fn pages(&self) -> BTreeSet<u64> {
        self.first()
            .into_iter()
            .chain(self.previous())
            .chain(self.around())
            .chain(self.next())
            .chain(self.last())
            .collect()
    }

    /// Returns the distinct offsets of [`pages`](Self::pages).
    pub fn boundary_offsets(&self) -> BTreeSet<u64> {
        self.pages()
            .into_iter()
            .map(|page| self.offset_of(page))
            .collect()
    }
}
