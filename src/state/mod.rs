//! State - Cache state owned by a viewer session
//!
//! The fragment store is an immutable value swapped on every merge; the
//! pending registry is the one mutable table, owned by the coordinator.

pub mod fragment_store;
pub mod pending;

pub use fragment_store::FragmentStore;
pub use pending::{PendingRequests, Waiter};
