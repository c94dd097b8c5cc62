//! PagedDataProvider Trait
//!
//! Abstraction the presentation layer renders from. Rows that have not been
//! fetched yet come back as placeholders of the right count, so the table
//! keeps its full height while pages load.

use std::ops::Range;

use crate::domain::CellValue;
use crate::state::FragmentStore;

/// A row slot in the rendered window
#[derive(Debug, Clone, PartialEq)]
pub enum RowSlot<R> {
    Loaded(R),
    Placeholder,
}

impl<R> RowSlot<R> {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, RowSlot::Placeholder)
    }
}

/// Paged data provider for lazy loading
pub trait PagedDataProvider {
    type Row: Clone;

    /// Get the total number of rows (loaded count while the total is unknown)
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a cached row by index (returns None if not yet loaded)
    fn cached_row(&self, index: usize) -> Option<Self::Row>;

    /// Check if a range is loaded
    fn is_range_loaded(&self, range: Range<usize>) -> bool;

    /// Rows of a range, placeholders where not loaded
    fn row_slots(&self, range: Range<usize>) -> Vec<RowSlot<Self::Row>> {
        let end = range.end.min(self.len());
        (range.start.min(end)..end)
            .map(|i| match self.cached_row(i) {
                Some(row) => RowSlot::Loaded(row),
                None => RowSlot::Placeholder,
            })
            .collect()
    }
}

impl PagedDataProvider for FragmentStore {
    type Row = Vec<CellValue>;

    fn len(&self) -> usize {
        self.row_count()
    }

    fn cached_row(&self, index: usize) -> Option<Self::Row> {
        self.row(index)
    }

    fn is_range_loaded(&self, range: Range<usize>) -> bool {
        FragmentStore::is_range_loaded(self, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, Fragment};

    fn store() -> FragmentStore {
        let page = |start: usize| {
            Fragment::new(
                start,
                vec![Column::new(
                    "n",
                    (start as i64..start as i64 + 10).map(CellValue::from).collect(),
                )],
            )
            .expect("fragment")
        };
        FragmentStore::new("ds", "t")
            .with_metadata(None, Some(40))
            .merge(&page(0))
            .and_then(|s| s.merge(&page(20)))
            .expect("merge")
    }

    #[test]
    fn test_placeholders_for_unfetched_page() {
        let store = store();
        let slots = store.row_slots(5..25);

        assert_eq!(slots.len(), 20);
        assert_eq!(slots[0], RowSlot::Loaded(vec![CellValue::Int(5)]));
        assert!(slots[5..15].iter().all(RowSlot::is_placeholder));
        assert_eq!(slots[15], RowSlot::Loaded(vec![CellValue::Int(20)]));
    }

    #[test]
    fn test_len_uses_known_row_count() {
        let store = store();
        assert_eq!(PagedDataProvider::len(&store), 40);
        assert!(!PagedDataProvider::is_range_loaded(&store, 0..20));
        assert_eq!(store.row_slots(35..60).len(), 5);
    }
}
