//! Scroll Prefetch Policy
//!
//! Maps viewport geometry to the pages that should be requested now. The
//! policy only decides; whether a page is served from cache or from the
//! network is the coordinator's business.

use crate::components::data_table::{Pagination, RenderWindow, ViewportGeometry};
use crate::services::coordinator::RequestCoordinator;
use crate::state::FragmentStore;

/// Result of one policy tick
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchPlan {
    /// Page under the lookahead edge of the viewport
    pub target_page: usize,
    /// Pages to request, target first, then skipped pages inside the window
    pub pages: Vec<usize>,
    /// Rows the virtualizer should render
    pub window: RenderWindow,
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollPrefetchPolicy {
    page_size: usize,
}

impl ScrollPrefetchPolicy {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn pagination(&self, store: &FragmentStore) -> Pagination {
        Pagination::new(self.page_size, store.known_row_count())
    }

    /// `floor(lookahead / page_height)` clamped to the last page
    pub fn target_page(&self, geometry: &ViewportGeometry, store: &FragmentStore) -> usize {
        self.pagination(store)
            .clamp_page(geometry.lookahead_page(self.page_size))
    }

    /// Page exists, is not cached and is not already in flight
    pub fn needs_fetch(
        &self,
        page_index: usize,
        store: &FragmentStore,
        coordinator: &RequestCoordinator,
    ) -> bool {
        let Some(range) = self.pagination(store).page_range(page_index) else {
            return false;
        };
        !store.is_page_fetched(range.start)
            && !store.is_range_loaded(range.clone())
            && !coordinator.is_in_flight(range.start)
    }

    /// Pages to request for the current geometry
    pub fn plan(
        &self,
        geometry: &ViewportGeometry,
        store: &FragmentStore,
        coordinator: &RequestCoordinator,
    ) -> PrefetchPlan {
        let target_page = self.target_page(geometry, store);
        let window = geometry.render_window(store.row_count());

        let mut pages = Vec::new();
        if self.needs_fetch(target_page, store, coordinator) {
            pages.push(target_page);
        }
        if let Some(visible) = self.pagination(store).pages_for_rows(window.rows.clone()) {
            pages.extend(
                visible.filter(|&p| p != target_page && self.needs_fetch(p, store, coordinator)),
            );
        }

        PrefetchPlan {
            target_page,
            pages,
            window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellValue, Column, Fragment, OutboundMessage};
    use crate::error::Result;
    use crate::services::transport::Transport;
    use std::sync::Arc;
    use std::time::Duration;

    struct NullTransport;

    impl Transport for NullTransport {
        fn post_message(&self, _message: &OutboundMessage) -> Result<()> {
            Ok(())
        }
    }

    fn page(start: usize, len: usize) -> Fragment {
        Fragment::new(
            start,
            vec![Column::new("n", (0..len).map(|_| CellValue::Null).collect())],
        )
        .expect("fragment")
    }

    fn store_with(pages: &[usize], total: usize) -> FragmentStore {
        let mut store = FragmentStore::new("ds", "t").with_metadata(None, Some(total));
        for &p in pages {
            store = store.merge(&page(p * 100, 100)).expect("merge");
        }
        store
    }

    fn coordinator() -> RequestCoordinator {
        RequestCoordinator::new(Arc::new(NullTransport), 8, Duration::from_secs(30))
    }

    // 20 visible rows of 24px, overscan 10
    fn geometry(scroll_row: usize) -> ViewportGeometry {
        ViewportGeometry::new(scroll_row as f32 * 24.0, 480.0, 24.0, 10)
    }

    #[test]
    fn test_target_page_from_scroll() {
        let policy = ScrollPrefetchPolicy::new(100);
        let store = store_with(&[0], 1000);
        assert_eq!(policy.target_page(&geometry(0), &store), 0);
        assert_eq!(policy.target_page(&geometry(75), &store), 1);
        assert_eq!(policy.target_page(&geometry(10_000), &store), 9);
    }

    #[test]
    fn test_cached_target_needs_nothing() {
        let policy = ScrollPrefetchPolicy::new(100);
        let store = store_with(&[0], 1000);
        let plan = policy.plan(&geometry(0), &store, &coordinator());
        assert_eq!(plan.target_page, 0);
        assert!(plan.pages.is_empty());
        assert_eq!(plan.window.rows, 0..30);
    }

    #[test]
    fn test_in_flight_target_is_skipped() {
        let policy = ScrollPrefetchPolicy::new(100);
        let store = store_with(&[0], 1000);
        let mut coordinator = coordinator();

        assert!(policy.needs_fetch(1, &store, &coordinator));
        let _fetch = coordinator.request_page(1, 100, &store);
        assert!(!policy.needs_fetch(1, &store, &coordinator));
    }

    #[test]
    fn test_backfill_skipped_pages_in_window() {
        let policy = ScrollPrefetchPolicy::new(100);
        // jumped straight to row 490; page 5 was fetched, page 4 was skipped
        let store = store_with(&[0, 5], 1000);
        let plan = policy.plan(&geometry(490), &store, &coordinator());

        assert_eq!(plan.target_page, 5);
        assert_eq!(plan.pages, vec![4]);
    }

    #[test]
    fn test_target_first_then_backfill() {
        let policy = ScrollPrefetchPolicy::new(100);
        let store = store_with(&[0], 1000);
        let plan = policy.plan(&geometry(190), &store, &coordinator());

        assert_eq!(plan.target_page, 2);
        assert_eq!(plan.pages, vec![2, 1]);
    }

    #[test]
    fn test_page_past_end_never_needed() {
        let policy = ScrollPrefetchPolicy::new(100);
        let store = store_with(&[0], 100);
        assert!(!policy.needs_fetch(1, &store, &coordinator()));
    }
}
