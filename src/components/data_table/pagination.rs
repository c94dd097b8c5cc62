//! Pagination
//!
//! Page arithmetic for the data table: page boundaries, clamping at the end
//! of the dataset, and which pages a row range touches.

use std::ops::{Range, RangeInclusive};

/// Page layout over a dataset whose length may still be unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    total_rows: Option<usize>,
}

impl Pagination {
    /// Create a layout; a zero page size is bumped to one
    pub fn new(page_size: usize, total_rows: Option<usize>) -> Self {
        Self {
            page_size: page_size.max(1),
            total_rows,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_rows(&self) -> Option<usize> {
        self.total_rows
    }

    /// First row of a page
    pub fn start_row(&self, page_index: usize) -> usize {
        page_index.saturating_mul(self.page_size)
    }

    /// Page containing a row
    pub fn page_of_row(&self, row: usize) -> usize {
        row / self.page_size
    }

    /// Number of pages; at least one so an empty table still has page 0
    pub fn total_pages(&self) -> usize {
        match self.total_rows {
            Some(total) => total.div_ceil(self.page_size).max(1),
            None => 1,
        }
    }

    /// Last valid page index, `None` while the length is unknown
    pub fn max_page(&self) -> Option<usize> {
        self.total_rows.map(|_| self.total_pages() - 1)
    }

    /// Clamp a page index into `[0, max_page]`
    pub fn clamp_page(&self, page_index: usize) -> usize {
        match self.max_page() {
            Some(max) => page_index.min(max),
            None => page_index,
        }
    }

    /// Rows to request for a page, never reaching past the end.
    ///
    /// Returns `None` when the page starts at or after the last row, or
    /// when its rows are not addressable.
    pub fn fetch_size(&self, page_index: usize) -> Option<usize> {
        self.page_range(page_index).map(|range| range.len())
    }

    /// Row range covered by a page after clamping
    pub fn page_range(&self, page_index: usize) -> Option<Range<usize>> {
        let start = page_index.checked_mul(self.page_size)?;
        let end = match self.total_rows {
            Some(total) if start >= total => return None,
            Some(total) => start.saturating_add(self.page_size).min(total),
            None => start.checked_add(self.page_size)?,
        };
        Some(start..end)
    }

    /// Pages touched by a non-empty row range
    pub fn pages_for_rows(&self, rows: Range<usize>) -> Option<RangeInclusive<usize>> {
        if rows.is_empty() {
            return None;
        }
        let first = self.page_of_row(rows.start);
        let last = self.clamp_page(self.page_of_row(rows.end - 1));
        (first <= last).then_some(first..=last)
    }
}
