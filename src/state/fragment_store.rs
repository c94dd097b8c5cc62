//! FragmentStore - Immutable local view of a remote dataset
//!
//! Columns hold only the rows fetched so far, in row order. `segments` maps
//! each merged fragment's start row to its length; a fragment's rows live in
//! the columns at the offset equal to the total length of the segments that
//! start before it. Merging returns a new store and leaves the old one valid
//! for whoever still holds it.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use ahash::AHashSet;

use crate::domain::{CellValue, Column, DataSet, Fragment};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentStore {
    dataset_id: Arc<str>,
    title: Arc<str>,
    columns: Arc<[Column]>,
    segments: Arc<BTreeMap<usize, usize>>,
    fetched: Arc<AHashSet<usize>>,
    row_count: Option<usize>,
}

impl FragmentStore {
    /// Empty store; the schema is adopted from the first merged fragment
    pub fn new(dataset_id: impl Into<Arc<str>>, title: impl Into<Arc<str>>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            title: title.into(),
            columns: Arc::from(Vec::new()),
            segments: Arc::default(),
            fetched: Arc::default(),
            row_count: None,
        }
    }

    /// Seed a store from data known before any request is made.
    ///
    /// Each whole page becomes a fetched segment. Trailing rows that do not
    /// fill a page are dropped unless they end the dataset, so later page
    /// requests never overlap the seed.
    pub fn bootstrap(dataset: &DataSet, page_size: usize) -> Result<Self> {
        dataset.validate()?;
        let page_size = page_size.max(1);
        let loaded = dataset.loaded_rows();
        let covers_all = dataset.row_count.is_none_or(|total| loaded >= total);
        let keep = if covers_all {
            dataset.row_count.map_or(loaded, |total| total.min(loaded))
        } else {
            loaded - loaded % page_size
        };

        let columns: Vec<Column> = dataset.columns.iter().map(|c| c.slice(0, keep)).collect();
        let mut segments = BTreeMap::new();
        let mut fetched = AHashSet::new();
        let mut start = 0;
        while start < keep {
            let len = page_size.min(keep - start);
            segments.insert(start, len);
            fetched.insert(start);
            start += len;
        }

        tracing::debug!(
            "Bootstrapped store {} with {} of {} initial rows",
            dataset.id,
            keep,
            loaded
        );

        Ok(Self {
            dataset_id: dataset.id.as_str().into(),
            title: dataset.title.as_str().into(),
            columns: columns.into(),
            segments: Arc::new(segments),
            fetched: Arc::new(fetched),
            row_count: dataset.row_count,
        })
    }

    // ==================== Merge ====================

    /// Merge a fragment, returning the updated store.
    ///
    /// Merging a fragment whose start row is already fetched returns an
    /// unchanged copy, so duplicate and out-of-order deliveries commute.
    pub fn merge(&self, fragment: &Fragment) -> Result<Self> {
        let row_start = fragment.row_start();

        if self.columns.is_empty() && self.segments.is_empty() {
            return Ok(self.adopt(fragment));
        }

        if fragment.columns().len() != self.columns.len() {
            return Err(Error::SchemaMismatch {
                expected: format!("{} columns", self.columns.len()),
                actual: format!("{} columns at row {row_start}", fragment.columns().len()),
            });
        }

        if self.fetched.contains(&row_start) {
            tracing::debug!("Rows at {} already merged, skipping", row_start);
            return Ok(self.clone());
        }

        let row_count = fragment.row_count().or(self.row_count);
        if fragment.is_empty() {
            return Ok(Self {
                row_count,
                ..self.clone()
            });
        }

        self.check_overlap(fragment)?;

        let offset = self.offset_of(row_start);
        let columns: Vec<Column> = self
            .columns
            .iter()
            .zip(fragment.columns())
            .map(|(existing, incoming)| {
                let mut data = Vec::with_capacity(existing.len() + incoming.len());
                data.extend_from_slice(&existing.data[..offset]);
                data.extend_from_slice(&incoming.data);
                data.extend_from_slice(&existing.data[offset..]);
                Column {
                    data,
                    ..existing.empty_like()
                }
            })
            .collect();

        let mut segments = (*self.segments).clone();
        segments.insert(row_start, fragment.len());
        let mut fetched = (*self.fetched).clone();
        fetched.insert(row_start);

        tracing::debug!(
            "Merged {} rows at {} (local offset {})",
            fragment.len(),
            row_start,
            offset
        );

        Ok(Self {
            dataset_id: self.dataset_id.clone(),
            title: self.title.clone(),
            columns: columns.into(),
            segments: Arc::new(segments),
            fetched: Arc::new(fetched),
            row_count,
        })
    }

    /// First fragment into a store without a schema
    fn adopt(&self, fragment: &Fragment) -> Self {
        let mut segments = BTreeMap::new();
        let mut fetched = AHashSet::new();
        if !fragment.is_empty() {
            segments.insert(fragment.row_start(), fragment.len());
            fetched.insert(fragment.row_start());
        }
        Self {
            dataset_id: self.dataset_id.clone(),
            title: self.title.clone(),
            columns: fragment.columns().into(),
            segments: Arc::new(segments),
            fetched: Arc::new(fetched),
            row_count: fragment.row_count().or(self.row_count),
        }
    }

    fn check_overlap(&self, fragment: &Fragment) -> Result<()> {
        let start = fragment.row_start();
        let end = fragment.row_end_exclusive();
        let before = self.segments.range(..start).next_back();
        let after = self.segments.range(start..).next();

        let hits_before = before.is_some_and(|(&s, &len)| s + len > start);
        let hits_after = after.is_some_and(|(&s, _)| s < end);
        if hits_before || hits_after {
            return Err(Error::Overlap { start_row: start });
        }
        Ok(())
    }

    /// Local column offset of a row start
    fn offset_of(&self, row_start: usize) -> usize {
        self.segments.range(..row_start).map(|(_, len)| len).sum()
    }

    /// Update the title and authoritative row count reported by the source
    pub fn with_metadata(&self, title: Option<&str>, row_count: Option<usize>) -> Self {
        Self {
            title: title.map(Arc::<str>::from).unwrap_or_else(|| self.title.clone()),
            row_count: row_count.or(self.row_count),
            ..self.clone()
        }
    }

    // ==================== Lookup ====================

    /// Local index of an absolute row
    fn local_index(&self, row: usize) -> Option<usize> {
        let (&start, &len) = self.segments.range(..=row).next_back()?;
        (row < start + len).then(|| self.offset_of(start) + (row - start))
    }

    /// Whether every row of `range` is loaded
    pub fn is_range_loaded(&self, range: Range<usize>) -> bool {
        if range.is_empty() {
            return true;
        }
        let mut cursor = range.start;
        let Some((&first, _)) = self.segments.range(..=cursor).next_back() else {
            return false;
        };
        for (&start, &len) in self.segments.range(first..) {
            if start > cursor {
                return false;
            }
            cursor = cursor.max(start + len);
            if cursor >= range.end {
                return true;
            }
        }
        false
    }

    /// Already-known rows `[start_row, start_row + size)` as a fragment
    pub fn slice_local(&self, start_row: usize, size: usize) -> Result<Fragment> {
        let end = start_row.checked_add(size).ok_or_else(|| Error::Invalid {
            message: format!("rows {start_row}..+{size} are not addressable"),
        })?;
        let range = start_row..end;
        if !self.is_range_loaded(range.clone()) {
            return Err(Error::Invalid {
                message: format!("rows {range:?} are not loaded"),
            });
        }
        let offset = match self.local_index(start_row) {
            Some(offset) => offset,
            None if size == 0 => 0,
            None => {
                return Err(Error::Invalid {
                    message: format!("row {start_row} is not loaded"),
                });
            }
        };
        let columns = self.columns.iter().map(|c| c.slice(offset, size)).collect();
        Ok(Fragment::new(start_row, columns)?.with_row_count(self.row_count))
    }

    /// O(1) membership test on fetched page start rows
    pub fn is_page_fetched(&self, page_start_row: usize) -> bool {
        self.fetched.contains(&page_start_row)
    }

    /// Cells of one absolute row, `None` while it is not loaded
    pub fn row(&self, row: usize) -> Option<Vec<CellValue>> {
        let index = self.local_index(row)?;
        self.columns
            .iter()
            .map(|c| c.data.get(index).cloned())
            .collect()
    }

    // ==================== Accessors ====================

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Authoritative row count once known, else the loaded count
    pub fn row_count(&self) -> usize {
        self.row_count.unwrap_or_else(|| self.loaded_row_count())
    }

    /// Row count reported by the source
    pub fn known_row_count(&self) -> Option<usize> {
        self.row_count
    }

    pub fn loaded_row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Fetched segment start rows in row order
    pub fn fetched_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(start: usize, len: usize) -> Fragment {
        let rows = start as i64..(start + len) as i64;
        Fragment::new(
            start,
            vec![
                Column::new("n", rows.clone().map(CellValue::from).collect()),
                Column::new("label", rows.map(|i| CellValue::from(format!("row {i}"))).collect()),
            ],
        )
        .expect("fragment")
        .with_row_count(Some(1000))
    }

    fn seeded() -> FragmentStore {
        FragmentStore::new("ds", "Test").merge(&fragment(0, 100)).expect("merge")
    }

    fn column_ints(store: &FragmentStore) -> Vec<i64> {
        store.columns()[0]
            .data
            .iter()
            .map(|cell| match cell {
                CellValue::Int(i) => *i,
                other => panic!("unexpected cell {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_out_of_order_merge_keeps_row_order() {
        let mut store = FragmentStore::new("ds", "Test");
        for start in [200, 0, 100] {
            store = store.merge(&fragment(start, 100)).expect("merge");
        }

        assert!(store.is_page_fetched(0));
        assert!(store.is_page_fetched(100));
        assert!(store.is_page_fetched(200));
        assert_eq!(column_ints(&store), (0..300).collect::<Vec<_>>());
        assert_eq!(store.row_count(), 1000);
        assert_eq!(store.loaded_row_count(), 300);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = seeded().merge(&fragment(300, 100)).expect("merge");
        let twice = once.merge(&fragment(300, 100)).expect("merge");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_commutes() {
        let a = seeded()
            .merge(&fragment(500, 100))
            .and_then(|s| s.merge(&fragment(200, 100)))
            .expect("merge");
        let b = seeded()
            .merge(&fragment(200, 100))
            .and_then(|s| s.merge(&fragment(500, 100)))
            .expect("merge");
        assert_eq!(a, b);
    }

    #[test]
    fn test_merge_leaves_previous_value_intact() {
        let before = seeded();
        let after = before.merge(&fragment(100, 100)).expect("merge");
        assert_eq!(before.loaded_row_count(), 100);
        assert_eq!(after.loaded_row_count(), 200);
    }

    #[test]
    fn test_columns_stay_aligned() {
        let mut store = seeded();
        for start in [700, 300, 900, 100] {
            store = store.merge(&fragment(start, 100)).expect("merge");
            let len = store.columns()[0].len();
            assert!(store.columns().iter().all(|c| c.len() == len));
        }
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let store = seeded();
        let narrow = Fragment::new(100, vec![Column::new("n", vec![CellValue::Null])])
            .expect("fragment");
        assert!(matches!(
            store.merge(&narrow),
            Err(Error::SchemaMismatch { .. })
        ));
        assert_eq!(store.loaded_row_count(), 100);
    }

    #[test]
    fn test_overlap_rejected() {
        let store = seeded();
        assert!(matches!(
            store.merge(&fragment(50, 100)),
            Err(Error::Overlap { start_row: 50 })
        ));
    }

    #[test]
    fn test_slice_local() {
        let store = seeded().merge(&fragment(100, 100)).expect("merge");
        let slice = store.slice_local(150, 20).expect("slice");
        assert_eq!(slice.row_start(), 150);
        assert_eq!(slice.len(), 20);
        assert_eq!(slice.columns()[0].data[0], CellValue::Int(150));

        let sparse = seeded().merge(&fragment(300, 100)).expect("merge");
        assert!(sparse.slice_local(50, 100).is_err());
        assert_eq!(
            sparse.slice_local(300, 1).expect("slice").columns()[1].data[0],
            CellValue::from("row 300")
        );
    }

    #[test]
    fn test_slice_past_addressable_rows_is_invalid() {
        let store = seeded();
        assert!(matches!(
            store.slice_local(usize::MAX - 10, 100),
            Err(Error::Invalid { .. })
        ));
    }

    #[test]
    fn test_fetched_pages_in_row_order() {
        let store = seeded()
            .merge(&fragment(500, 100))
            .and_then(|s| s.merge(&fragment(200, 100)))
            .expect("merge");
        assert_eq!(store.fetched_pages().collect::<Vec<_>>(), vec![0, 200, 500]);
    }

    #[test]
    fn test_row_lookup_through_gap() {
        let store = seeded().merge(&fragment(500, 100)).expect("merge");
        assert!(store.row(250).is_none());
        assert_eq!(
            store.row(512),
            Some(vec![CellValue::Int(512), CellValue::from("row 512")])
        );
    }

    #[test]
    fn test_range_loaded_across_segments() {
        let store = seeded().merge(&fragment(100, 100)).expect("merge");
        assert!(store.is_range_loaded(0..200));
        assert!(store.is_range_loaded(90..110));
        assert!(!store.is_range_loaded(150..250));
    }

    #[test]
    fn test_bootstrap_truncates_to_whole_pages() {
        let dataset = DataSet::new(
            "Seed",
            vec![Column::new("n", (0..150i64).map(CellValue::from).collect())],
        )
        .with_row_count(1000);

        let store = FragmentStore::bootstrap(&dataset, 100).expect("bootstrap");
        assert_eq!(store.loaded_row_count(), 100);
        assert!(store.is_page_fetched(0));
        assert!(!store.is_page_fetched(100));
    }

    #[test]
    fn test_bootstrap_keeps_complete_dataset() {
        let dataset = DataSet::new(
            "Seed",
            vec![Column::new("n", (0..150i64).map(CellValue::from).collect())],
        )
        .with_row_count(150);

        let store = FragmentStore::bootstrap(&dataset, 100).expect("bootstrap");
        assert_eq!(store.loaded_row_count(), 150);
        assert!(store.is_page_fetched(100));
        assert!(store.is_range_loaded(0..150));
    }
}
