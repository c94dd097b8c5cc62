//! Fragment - Unit of transfer between the source and the local cache

use std::sync::Arc;

use crate::domain::dataset::{Column, DataSet};
use crate::error::{Error, Result};

/// A contiguous slice of the dataset starting at `row_start`.
///
/// Every column holds exactly the fragment's rows. Columns are shared behind
/// an `Arc`, so handing the same fragment to several waiters is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    row_start: usize,
    len: usize,
    columns: Arc<[Column]>,
    /// Total row count reported alongside the fragment, if any
    row_count: Option<usize>,
}

impl Fragment {
    /// Build a fragment, checking that all columns have the same length
    pub fn new(row_start: usize, columns: Vec<Column>) -> Result<Self> {
        let len = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != len) {
            return Err(Error::SchemaMismatch {
                expected: format!("{len} rows in every column"),
                actual: format!("{} rows in column '{}'", bad.len(), bad.name),
            });
        }
        Ok(Self {
            row_start,
            len,
            columns: columns.into(),
            row_count: None,
        })
    }

    /// Build a fragment from a dataset payload received at `row_start`
    pub fn from_dataset(row_start: usize, dataset: DataSet) -> Result<Self> {
        let row_count = dataset.row_count;
        let fragment = Self::new(row_start, dataset.columns)?;
        Ok(fragment.with_row_count(row_count))
    }

    pub fn with_row_count(mut self, row_count: Option<usize>) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn row_start(&self) -> usize {
        self.row_start
    }

    /// Inclusive last row, `None` for an empty fragment
    pub fn row_end(&self) -> Option<usize> {
        (self.len > 0).then(|| self.row_start + self.len - 1)
    }

    /// Exclusive end row
    pub fn row_end_exclusive(&self) -> usize {
        self.row_start.saturating_add(self.len)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    /// Leading part of the fragment, at most `len` rows
    pub fn truncated(&self, len: usize) -> Self {
        if len >= self.len {
            return self.clone();
        }
        let columns: Vec<Column> = self.columns.iter().map(|c| c.slice(0, len)).collect();
        Self {
            row_start: self.row_start,
            len,
            columns: columns.into(),
            row_count: self.row_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::CellValue;

    fn ints(range: std::ops::Range<i64>) -> Vec<CellValue> {
        range.map(CellValue::from).collect()
    }

    #[test]
    fn test_row_bounds() {
        let fragment = Fragment::new(300, vec![Column::new("a", ints(0..100))]).expect("fragment");
        assert_eq!(fragment.row_start(), 300);
        assert_eq!(fragment.row_end(), Some(399));
        assert_eq!(fragment.row_end_exclusive(), 400);
    }

    #[test]
    fn test_empty_fragment_has_no_end() {
        let fragment = Fragment::new(0, vec![Column::new("a", vec![])]).expect("fragment");
        assert!(fragment.is_empty());
        assert_eq!(fragment.row_end(), None);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = Fragment::new(
            0,
            vec![Column::new("a", ints(0..3)), Column::new("b", ints(0..2))],
        );
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_truncated_keeps_start() {
        let fragment = Fragment::new(100, vec![Column::new("a", ints(0..10))]).expect("fragment");
        let head = fragment.truncated(4);
        assert_eq!(head.row_start(), 100);
        assert_eq!(head.len(), 4);
        assert_eq!(head.columns()[0].data, ints(0..4));
    }
}
