//! Service Layer
//!
//! Drives the paged cache: the prefetch policy decides which pages are needed,
//! the coordinator turns those into requests over the transport, and the
//! session merges responses into the fragment store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        DataSession                           │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌───────────┐  │
//! │  │ ScrollPrefetch   │─▶│ RequestCoordinator│─▶│ Transport │──┼──▶ source
//! │  │ Policy (pages)   │  │ (pending table)   │  └───────────┘  │
//! │  └──────────────────┘  └────────┬─────────┘                 │
//! │                                 │ Delivered                  │
//! │                        ┌────────▼─────────┐                 │
//! │  source ──on_message──▶│  FragmentStore   │                 │
//! │                        └──────────────────┘                 │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼ ViewerEvent
//!                    presentation layer
//! ```

mod coordinator;
mod data_source;
mod events;
mod prefetch;
mod session;
mod transport;

pub use coordinator::*;
pub use data_source::*;
pub use events::*;
pub use prefetch::*;
pub use session::*;
pub use transport::*;
