//! Domain - Data types shared by the cache layers
//!
//! Column-major datasets, fragments of them, and the wire messages that carry
//! fragments between the viewer and the source.

pub mod dataset;
pub mod fragment;
pub mod message;

pub use dataset::{CellValue, Column, DataSet};
pub use fragment::Fragment;
pub use message::{InboundMessage, InboundType, OutboundMessage, OutboundType, protocol_schema};
