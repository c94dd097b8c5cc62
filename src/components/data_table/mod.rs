//! DataTable Support
//!
//! Page math, viewport geometry and the row provider seam the virtualized
//! table renders through.

pub mod data_provider;
pub mod pagination;
pub mod viewport;

pub use data_provider::{PagedDataProvider, RowSlot};
pub use pagination::Pagination;
pub use viewport::{RenderWindow, ViewportGeometry};
