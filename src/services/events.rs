//! Viewer Events
//!
//! Notifications emitted by a session for the presentation layer.

use std::sync::Arc;

/// Events emitted by a viewer session
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    /// Session opened against a dataset
    Opened {
        dataset_id: Arc<str>,
    },

    /// A fragment was merged; re-render from the new store
    StoreUpdated {
        /// Rows present locally
        loaded_rows: usize,
        /// Authoritative row count, if known
        row_count: Option<usize>,
    },

    /// A page request failed and will be retried on a later tick
    PageFailed {
        start_row: usize,
        reason: Arc<str>,
    },

    /// A response arrived with no pending request for it
    DuplicateResponse {
        start_row: usize,
    },

    /// Session torn down; later responses are ignored
    Disposed,
}
