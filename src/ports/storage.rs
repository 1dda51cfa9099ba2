//! Record store port: read/write/delete contract for donors and recipients.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use crate::domain::{Donor, InvalidRecord, Recipient};

/// A stored row that could not be turned into a domain record.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    /// Row identifier in the store
    pub id: i64,
    pub reason: InvalidRecord,
}

/// Result of loading one table.
///
/// Invalid rows do not abort the load; they are collected in `rejected`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch<T> {
    /// Valid records in store order
    pub records: Vec<T>,
    /// Rows that failed validation
    pub rejected: Vec<RejectedRecord>,
}

impl<T> RecordBatch<T> {
    #[must_use]
    pub fn new(records: Vec<T>, rejected: Vec<RejectedRecord>) -> Self {
        Self { records, rejected }
    }

    /// Total rows seen, valid or not.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}

impl<T> Default for RecordBatch<T> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Trait for local record storage.
pub trait RecordStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every donor, in insertion order.
    ///
    /// # Errors
    /// Returns error if the backend fails. Invalid rows are reported in the batch.
    fn list_donors(&self) -> Result<RecordBatch<Donor>, Self::Error>;

    /// Load every recipient, in insertion order.
    ///
    /// # Errors
    /// Returns error if the backend fails. Invalid rows are reported in the batch.
    fn list_recipients(&self) -> Result<RecordBatch<Recipient>, Self::Error>;

    /// Insert a donor and return its new identifier. `donor.id` is ignored.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn add_donor(&self, donor: &Donor) -> Result<i64, Self::Error>;

    /// Insert a recipient and return its new identifier. `recipient.id` is ignored.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn add_recipient(&self, recipient: &Recipient) -> Result<i64, Self::Error>;

    /// Delete a donor by ID. Returns `false` if no such row existed.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete_donor(&self, id: i64) -> Result<bool, Self::Error>;

    /// Delete a recipient by ID. Returns `false` if no such row existed.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete_recipient(&self, id: i64) -> Result<bool, Self::Error>;

    /// Number of donor rows, including invalid ones.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_donors(&self) -> Result<usize, Self::Error>;

    /// Number of recipient rows, including invalid ones.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_recipients(&self) -> Result<usize, Self::Error>;
}
