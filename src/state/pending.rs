//! Pending request registry
//!
//! Correlation table from a request key (the start row sent to the source) to
//! the waiters of that in-flight request. Keys stay registered from the moment
//! the request is sent until it is resolved, rejected, expired or cancelled.

use std::time::{Duration, Instant};

use hashlink::LinkedHashMap;
use tokio::sync::oneshot;

use crate::domain::Fragment;
use crate::error::{Error, Result};

/// Completion handle given to each waiter
pub type Waiter = oneshot::Receiver<Result<Fragment>>;

#[derive(Debug)]
struct PendingEntry {
    fetch_size: usize,
    sent_at: Instant,
    waiters: Vec<oneshot::Sender<Result<Fragment>>>,
}

/// In-flight requests in send order
#[derive(Debug, Default)]
pub struct PendingRequests {
    entries: LinkedHashMap<usize, PendingEntry>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: usize) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in the order their requests were sent
    pub fn keys(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    /// Rows requested for a key
    pub fn fetch_size(&self, key: usize) -> Option<usize> {
        self.entries.get(&key).map(|e| e.fetch_size)
    }

    /// Register a freshly sent request with its first waiter
    pub fn register(&mut self, key: usize, fetch_size: usize, now: Instant) -> Waiter {
        let (tx, rx) = oneshot::channel();
        match self.entries.get_mut(&key) {
            Some(entry) => entry.waiters.push(tx),
            None => {
                self.entries.insert(
                    key,
                    PendingEntry {
                        fetch_size,
                        sent_at: now,
                        waiters: vec![tx],
                    },
                );
            }
        }
        rx
    }

    /// Attach another waiter to a request already in flight
    pub fn join(&mut self, key: usize) -> Option<Waiter> {
        let entry = self.entries.get_mut(&key)?;
        let (tx, rx) = oneshot::channel();
        entry.waiters.push(tx);
        Some(rx)
    }

    /// Remove an entry and hand the fragment to all its waiters.
    ///
    /// Returns the number of waiters, or `None` if the key was not pending.
    pub fn resolve(&mut self, key: usize, fragment: &Fragment) -> Option<usize> {
        let entry = self.entries.remove(&key)?;
        let count = entry.waiters.len();
        for waiter in entry.waiters {
            // Receiver may have been dropped by a consumer that stopped waiting
            let _ = waiter.send(Ok(fragment.clone()));
        }
        Some(count)
    }

    /// Remove an entry and fail all its waiters
    pub fn reject(&mut self, key: usize, error: Error) -> bool {
        let Some(entry) = self.entries.remove(&key) else {
            return false;
        };
        for waiter in entry.waiters {
            let _ = waiter.send(Err(error.clone()));
        }
        true
    }

    /// Keys sent more than `timeout` before `now`
    pub fn expired(&self, now: Instant, timeout: Duration) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.sent_at) >= timeout)
            .map(|(k, _)| *k)
            .collect()
    }

    /// Fail every entry with `Cancelled`
    pub fn cancel_all(&mut self) -> usize {
        let keys = self.keys();
        for &key in &keys {
            self.reject(key, Error::Cancelled { start_row: key });
        }
        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellValue, Column};
    use futures::FutureExt;

    fn fragment(start: usize) -> Fragment {
        Fragment::new(start, vec![Column::new("a", vec![CellValue::Int(start as i64)])])
            .expect("fragment")
    }

    #[test]
    fn test_resolve_fans_out_to_all_waiters() {
        let mut pending = PendingRequests::new();
        let first = pending.register(300, 100, Instant::now());
        let second = pending.join(300).expect("joined");

        assert_eq!(pending.resolve(300, &fragment(300)), Some(2));
        assert!(!pending.contains(300));

        for waiter in [first, second] {
            let result = waiter.now_or_never().expect("ready").expect("sender kept");
            assert_eq!(result.expect("fragment").row_start(), 300);
        }
    }

    #[test]
    fn test_second_resolve_is_ignored() {
        let mut pending = PendingRequests::new();
        let _waiter = pending.register(0, 100, Instant::now());
        assert_eq!(pending.resolve(0, &fragment(0)), Some(1));
        assert_eq!(pending.resolve(0, &fragment(0)), None);
    }

    #[test]
    fn test_join_unknown_key() {
        let mut pending = PendingRequests::new();
        assert!(pending.join(7).is_none());
    }

    #[test]
    fn test_reject_delivers_error() {
        let mut pending = PendingRequests::new();
        let waiter = pending.register(100, 100, Instant::now());
        assert!(pending.reject(100, Error::Transport { message: "down".into() }));

        let result = waiter.now_or_never().expect("ready").expect("sender kept");
        assert!(matches!(result, Err(Error::Transport { .. })));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_expired_and_send_order() {
        let mut pending = PendingRequests::new();
        let start = Instant::now();
        let _a = pending.register(500, 100, start);
        let _b = pending.register(200, 100, start + Duration::from_secs(20));

        assert_eq!(pending.keys(), vec![500, 200]);
        assert_eq!(
            pending.expired(start + Duration::from_secs(30), Duration::from_secs(30)),
            vec![500]
        );
    }

    #[test]
    fn test_cancel_all() {
        let mut pending = PendingRequests::new();
        let waiter = pending.register(0, 10, Instant::now());
        let _other = pending.register(10, 10, Instant::now());

        assert_eq!(pending.cancel_all(), 2);
        let result = waiter.now_or_never().expect("ready").expect("sender kept");
        assert!(matches!(result, Err(Error::Cancelled { start_row: 0 })));
    }
}
