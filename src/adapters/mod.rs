//! Adapters layer: Concrete implementations of ports.
//!
//! - `sqlite`: SQLite record store
//! - `sanitize`: identifier redaction for log output

pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
