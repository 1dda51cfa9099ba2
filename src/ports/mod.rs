//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, the record store is the only boundary
//! between the matching logic and the outside world.

mod storage;

pub use storage::{RecordBatch, RecordStore, RejectedRecord};
