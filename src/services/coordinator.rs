//! Request Coordinator
//!
//! Turns "need page P" into at most one outstanding request per start row and
//! routes asynchronous responses back to every waiter of that request.
//!
//! ## Flow
//!
//! ```text
//! request_page(p) ──▶ cached? ──yes──▶ PageFetch::Ready(slice)
//!                       │no
//!                       ▼
//!                   in flight? ──yes──▶ join waiter
//!                       │no
//!                       ▼
//!               post request_rows + register waiter
//!
//! handle_response(msg) ──▶ pending? ──no──▶ Duplicate (dropped)
//!                            │yes
//!                            ▼
//!          complete page + merge ok? ──no──▶ Failed (waiters rejected)
//!                            │yes
//!                            ▼
//!                    resolve waiters ──▶ Delivered(merged store)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::components::data_table::Pagination;
use crate::domain::{Fragment, InboundMessage, InboundType, OutboundMessage};
use crate::error::{Error, Result};
use crate::services::transport::Transport;
use crate::state::{FragmentStore, PendingRequests, Waiter};

/// Pending result of a page request
#[derive(Debug)]
pub enum PageFetch {
    /// Resolved without a round trip (cache hit or rejected up front)
    Ready(Option<Result<Fragment>>),
    /// Waiting on the response for `start_row`
    Waiting { start_row: usize, waiter: Waiter },
}

impl PageFetch {
    fn ready(result: Result<Fragment>) -> Self {
        PageFetch::Ready(Some(result))
    }

    /// Whether the result is available without waiting for the source
    pub fn is_ready(&self) -> bool {
        matches!(self, PageFetch::Ready(_))
    }

    /// Whether this call issued or joined a network request
    pub fn is_waiting(&self) -> bool {
        matches!(self, PageFetch::Waiting { .. })
    }

    /// Error of a request rejected up front
    pub fn error(&self) -> Option<&Error> {
        match self {
            PageFetch::Ready(Some(Err(e))) => Some(e),
            _ => None,
        }
    }
}

impl Future for PageFetch {
    type Output = Result<Fragment>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            PageFetch::Ready(result) => Poll::Ready(result.take().unwrap_or_else(|| {
                Err(Error::Invalid {
                    message: "page fetch polled after completion".to_string(),
                })
            })),
            PageFetch::Waiting { start_row, waiter } => match Pin::new(waiter).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Cancelled {
                    start_row: *start_row,
                })),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// What an inbound message did
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Not a data message, or the coordinator was disposed
    Ignored,
    /// No pending request for this start row; nothing changed
    Duplicate { start_row: usize },
    /// Waiters resolved; `store` is the store with the fragment merged
    Delivered {
        fragment: Fragment,
        store: FragmentStore,
        waiters: usize,
    },
    /// Waiters rejected
    Failed { start_row: usize, error: Error },
}

/// Correlates page requests with responses over a fire-and-forget transport
pub struct RequestCoordinator {
    transport: Arc<dyn Transport>,
    pending: PendingRequests,
    max_in_flight: usize,
    request_timeout: Duration,
    disposed: bool,
}

impl RequestCoordinator {
    pub fn new(transport: Arc<dyn Transport>, max_in_flight: usize, request_timeout: Duration) -> Self {
        Self {
            transport,
            pending: PendingRequests::new(),
            max_in_flight: max_in_flight.max(1),
            request_timeout,
            disposed: false,
        }
    }

    pub fn is_in_flight(&self, start_row: usize) -> bool {
        self.pending.contains(start_row)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Start rows in flight, in send order
    pub fn in_flight_keys(&self) -> Vec<usize> {
        self.pending.keys()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Send the `ready` handshake; the answer resolves the page-0 entry
    pub fn open(&mut self, fetch_size: usize) -> PageFetch {
        if let Some(waiter) = self.pending.join(0) {
            return PageFetch::Waiting {
                start_row: 0,
                waiter,
            };
        }
        self.send(OutboundMessage::ready(fetch_size))
    }

    /// Request page `page_index` of `page_size` rows
    pub fn request_page(
        &mut self,
        page_index: usize,
        page_size: usize,
        store: &FragmentStore,
    ) -> PageFetch {
        if self.disposed {
            return PageFetch::ready(Err(Error::Cancelled {
                start_row: page_index.saturating_mul(page_size),
            }));
        }
        if page_size == 0 {
            return PageFetch::ready(Err(Error::Invalid {
                message: "page size must be positive".to_string(),
            }));
        }

        let pages = Pagination::new(page_size, store.known_row_count());
        let Some(range) = pages.page_range(page_index) else {
            return PageFetch::ready(Err(Error::Invalid {
                message: format!("page {page_index} is past the last row"),
            }));
        };
        let (start_row, fetch_size) = (range.start, range.len());

        if store.is_range_loaded(range) {
            tracing::debug!("Cache hit for rows {}..+{}", start_row, fetch_size);
            return PageFetch::ready(store.slice_local(start_row, fetch_size));
        }

        if let Some(waiter) = self.pending.join(start_row) {
            tracing::debug!("Rows at {} already in flight, joining", start_row);
            return PageFetch::Waiting { start_row, waiter };
        }

        if self.pending.len() >= self.max_in_flight {
            tracing::debug!(
                "Deferring rows at {}: {} requests in flight",
                start_row,
                self.pending.len()
            );
            return PageFetch::ready(Err(Error::QueueFull {
                limit: self.max_in_flight,
            }));
        }

        self.send(OutboundMessage::request_rows(start_row, fetch_size))
    }

    /// Post a request and register it in the same call
    fn send(&mut self, message: OutboundMessage) -> PageFetch {
        let start_row = message.start_row;
        if let Err(e) = self.transport.post_message(&message) {
            tracing::warn!("Failed to send {:?} for rows at {}: {}", message.msg_type, start_row, e);
            return PageFetch::ready(Err(e));
        }
        tracing::debug!(
            "Sent {:?} for rows {}..+{}",
            message.msg_type,
            start_row,
            message.fetch_size
        );
        let waiter = self
            .pending
            .register(start_row, message.fetch_size, Instant::now());
        PageFetch::Waiting { start_row, waiter }
    }

    /// Route an inbound message to the waiters of its request
    pub fn handle_response(
        &mut self,
        message: InboundMessage,
        store: &FragmentStore,
    ) -> ResponseOutcome {
        if self.disposed {
            return ResponseOutcome::Ignored;
        }
        let start_row = message.start_row;

        match message.msg_type {
            InboundType::Other => return ResponseOutcome::Ignored,
            InboundType::Error => {
                let error = Error::Transport {
                    message: message
                        .error
                        .unwrap_or_else(|| "source reported an error".to_string()),
                };
                return self.fail(start_row, error);
            }
            InboundType::InitialData | InboundType::ReceiveRows => {}
        }

        let Some(fetch_size) = self.pending.fetch_size(start_row) else {
            tracing::warn!("Dropping response for rows at {}: no pending request", start_row);
            return ResponseOutcome::Duplicate { start_row };
        };

        let fragment = match message.into_fragment() {
            Ok(fragment) => fragment.truncated(fetch_size),
            Err(e) => return self.fail(start_row, e),
        };

        let fragment = match Self::check_complete(fragment, fetch_size, store) {
            Ok(fragment) => fragment,
            Err(e) => return self.fail(start_row, e),
        };

        // Waiters only hear about rows the store accepted
        let merged = match store.merge(&fragment) {
            Ok(merged) => merged,
            Err(e) => return self.fail(start_row, e),
        };

        let waiters = self.pending.resolve(start_row, &fragment).unwrap_or(0);
        tracing::debug!(
            "Resolved rows at {} ({} rows, {} waiters)",
            start_row,
            fragment.len(),
            waiters
        );
        ResponseOutcome::Delivered {
            fragment,
            store: merged,
            waiters,
        }
    }

    /// A short delivery is only complete when it ends the dataset.
    ///
    /// While the row count is unknown, a short page is taken as the end.
    fn check_complete(fragment: Fragment, fetch_size: usize, store: &FragmentStore) -> Result<Fragment> {
        if fragment.len() >= fetch_size {
            return Ok(fragment);
        }
        let end = fragment.row_end_exclusive();
        match fragment.row_count().or(store.known_row_count()) {
            Some(total) if end >= total => Ok(fragment),
            Some(total) => Err(Error::SchemaMismatch {
                expected: format!("{fetch_size} rows at {}", fragment.row_start()),
                actual: format!("{} rows of {total}", fragment.len()),
            }),
            None => {
                tracing::debug!("Short page at {} marks the end at row {}", fragment.row_start(), end);
                Ok(fragment.with_row_count(Some(end)))
            }
        }
    }

    /// Reject a pending request; later ticks may request it again
    pub fn fail(&mut self, start_row: usize, error: Error) -> ResponseOutcome {
        if self.pending.reject(start_row, error.clone()) {
            tracing::warn!("Request for rows at {} failed: {}", start_row, error);
            ResponseOutcome::Failed { start_row, error }
        } else {
            tracing::warn!("Ignoring failure for rows at {}: no pending request", start_row);
            ResponseOutcome::Duplicate { start_row }
        }
    }

    /// Reject requests older than the timeout
    pub fn expire(&mut self, now: Instant) -> Vec<usize> {
        let expired = self.pending.expired(now, self.request_timeout);
        for &start_row in &expired {
            self.fail(start_row, Error::Timeout { start_row });
        }
        expired
    }

    /// Cancel everything in flight and ignore all later responses
    pub fn dispose(&mut self) -> usize {
        self.disposed = true;
        let cancelled = self.pending.cancel_all();
        if cancelled > 0 {
            tracing::info!("Cancelled {} pending requests on dispose", cancelled);
        }
        cancelled
    }
}

impl std::fmt::Debug for RequestCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("in_flight", &self.pending.keys())
            .field("max_in_flight", &self.max_in_flight)
            .field("disposed", &self.disposed)
            .finish()
    }
}
