//! Components - Data table support
//!
//! Pure computations for the virtualized table; no I/O and no rendering.

pub mod data_table;
