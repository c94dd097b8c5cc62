//! Dataview Library
//!
//! Incremental paged cache for large tabular datasets viewed through a
//! virtualized, scrolling table. Rows live at a remote source and are pulled
//! in fixed-size pages as the viewport approaches them; fragments may arrive
//! late, duplicated or out of order and are merged into one consistent store.

pub mod components;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod helpers;
pub mod services;
pub mod state;
