//! Data Session
//!
//! One viewer attached to one dataset. Owns the current fragment store, the
//! request coordinator and the prefetch policy, and drives them from viewport
//! ticks and inbound messages. All methods run on the caller's event loop;
//! every mutation of the pending table happens within a single call.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::components::data_table::ViewportGeometry;
use crate::config::ViewerConfig;
use crate::domain::{DataSet, InboundMessage, InboundType};
use crate::error::{Error, Result};
use crate::services::coordinator::{PageFetch, RequestCoordinator, ResponseOutcome};
use crate::services::events::ViewerEvent;
use crate::services::prefetch::{PrefetchPlan, ScrollPrefetchPolicy};
use crate::services::transport::Transport;
use crate::state::FragmentStore;

/// Result of a viewport tick
#[derive(Debug)]
pub struct TickResult {
    pub plan: PrefetchPlan,
    /// One fetch per planned page, in plan order
    pub fetches: Vec<(usize, PageFetch)>,
}

pub struct DataSession {
    store: FragmentStore,
    coordinator: RequestCoordinator,
    policy: ScrollPrefetchPolicy,
    geometry: Option<ViewportGeometry>,
    tx: Sender<ViewerEvent>,
    rx: Receiver<ViewerEvent>,
}

impl DataSession {
    /// Session over a dataset whose rows are all remote
    pub fn new(
        dataset_id: impl Into<Arc<str>>,
        transport: Arc<dyn Transport>,
        config: &ViewerConfig,
    ) -> Self {
        Self::with_store(FragmentStore::new(dataset_id, ""), transport, config)
    }

    /// Session seeded with rows already known at construction
    pub fn with_bootstrap(
        dataset: &DataSet,
        transport: Arc<dyn Transport>,
        config: &ViewerConfig,
    ) -> Result<Self> {
        let store = FragmentStore::bootstrap(dataset, config.page_size)?;
        Ok(Self::with_store(store, transport, config))
    }

    fn with_store(store: FragmentStore, transport: Arc<dyn Transport>, config: &ViewerConfig) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            store,
            coordinator: RequestCoordinator::new(
                transport,
                config.max_in_flight,
                config.request_timeout(),
            ),
            policy: ScrollPrefetchPolicy::new(config.page_size),
            geometry: None,
            tx,
            rx,
        }
    }

    /// Event stream for the presentation layer
    pub fn events(&self) -> Receiver<ViewerEvent> {
        self.rx.clone()
    }

    /// Snapshot of the current store; stays valid across later merges
    pub fn store(&self) -> FragmentStore {
        self.store.clone()
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn page_size(&self) -> usize {
        self.policy.page_size()
    }

    fn emit(&self, event: ViewerEvent) {
        let _ = self.tx.send(event);
    }

    /// Announce the session and, without seeded rows, send the handshake
    pub fn open(&mut self) -> Option<PageFetch> {
        tracing::info!("Opening data session for {}", self.store.dataset_id());
        self.emit(ViewerEvent::Opened {
            dataset_id: self.store.dataset_id().into(),
        });
        if self.store.is_page_fetched(0) {
            return None;
        }
        Some(self.coordinator.open(self.policy.page_size()))
    }

    /// Request one page directly, bypassing the scroll policy
    pub fn request_page(&mut self, page_index: usize) -> PageFetch {
        self.coordinator
            .request_page(page_index, self.policy.page_size(), &self.store)
    }

    /// Scroll event
    pub fn on_scroll(&mut self, geometry: ViewportGeometry) -> TickResult {
        self.on_viewport(geometry)
    }

    /// Resize event
    pub fn on_resize(&mut self, geometry: ViewportGeometry) -> TickResult {
        self.on_viewport(geometry)
    }

    fn on_viewport(&mut self, geometry: ViewportGeometry) -> TickResult {
        self.geometry = Some(geometry);
        self.run_policy(geometry)
    }

    fn run_policy(&mut self, geometry: ViewportGeometry) -> TickResult {
        let plan = self.policy.plan(&geometry, &self.store, &self.coordinator);
        let page_size = self.policy.page_size();
        let mut fetches = Vec::with_capacity(plan.pages.len());
        for &page in &plan.pages {
            let fetch = self.coordinator.request_page(page, page_size, &self.store);
            match fetch.error() {
                // Retried on a later tick once the queue drains
                None | Some(Error::QueueFull { .. }) => {}
                Some(e) => self.emit(ViewerEvent::PageFailed {
                    start_row: page * page_size,
                    reason: e.to_string().into(),
                }),
            }
            fetches.push((page, fetch));
        }
        TickResult { plan, fetches }
    }

    /// Re-run the policy with the last known geometry
    fn refresh(&mut self) {
        if let Some(geometry) = self.geometry {
            // Waiters are not needed here; responses merge through on_message
            let _ = self.run_policy(geometry);
        }
    }

    /// Inbound message from the source
    pub fn on_message(&mut self, message: InboundMessage) -> ResponseOutcome {
        let title = (message.msg_type == InboundType::InitialData)
            .then(|| message.data.as_ref().map(|d| d.title.clone()))
            .flatten();

        let outcome = self.coordinator.handle_response(message, &self.store);
        match &outcome {
            ResponseOutcome::Delivered { store, .. } => {
                self.store = store.with_metadata(title.as_deref(), None);
                self.emit(ViewerEvent::StoreUpdated {
                    loaded_rows: self.store.loaded_row_count(),
                    row_count: self.store.known_row_count(),
                });
                self.refresh();
            }
            ResponseOutcome::Failed { start_row, error } => {
                self.emit(ViewerEvent::PageFailed {
                    start_row: *start_row,
                    reason: error.to_string().into(),
                });
            }
            ResponseOutcome::Duplicate { start_row } => {
                self.emit(ViewerEvent::DuplicateResponse {
                    start_row: *start_row,
                });
            }
            ResponseOutcome::Ignored => {}
        }
        outcome
    }

    /// Inbound message as JSON
    pub fn on_message_json(&mut self, json: &str) -> Result<ResponseOutcome> {
        let message = InboundMessage::from_json(json)?;
        Ok(self.on_message(message))
    }

    /// Periodic housekeeping: expire stale requests and retry
    pub fn tick(&mut self, now: Instant) -> Vec<usize> {
        let expired = self.coordinator.expire(now);
        for &start_row in &expired {
            self.emit(ViewerEvent::PageFailed {
                start_row,
                reason: "request timed out".into(),
            });
        }
        if !expired.is_empty() {
            self.refresh();
        }
        expired
    }

    /// Tear the session down; pending waiters get `Cancelled`
    pub fn dispose(&mut self) {
        if self.coordinator.is_disposed() {
            return;
        }
        self.coordinator.dispose();
        self.geometry = None;
        tracing::info!("Disposed data session for {}", self.store.dataset_id());
        self.emit(ViewerEvent::Disposed);
    }
}

impl std::fmt::Debug for DataSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSession")
            .field("dataset", &self.store.dataset_id())
            .field("loaded_rows", &self.store.loaded_row_count())
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
