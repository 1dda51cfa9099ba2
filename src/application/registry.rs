//! Registry service: record entry, listing and deletion.
//!
//! Derived fields are computed here, at entry time:
//! - years on dialysis from the dialysis-start date and today's date
//! - the donor KDPI proxy from age and risk factors

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{Donor, DonorDraft, Recipient, RecipientDraft};
use crate::ports::{RecordBatch, RecordStore};
use crate::KidneyMatchError;

/// Service for creating, listing and deleting records.
pub struct RegistryService<S>
where
    S: RecordStore,
{
    storage: Arc<S>,
}

impl<S> RegistryService<S>
where
    S: RecordStore,
    S::Error: Into<crate::adapters::StorageError>,
{
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Register a recipient, deriving years on dialysis as of today.
    ///
    /// # Errors
    /// Returns a validation error for a bad draft, or a storage error.
    pub fn register_recipient(&self, draft: RecipientDraft) -> Result<Recipient, KidneyMatchError> {
        self.register_recipient_on(draft, chrono::Local::now().date_naive())
    }

    /// Register a recipient with an explicit "today".
    ///
    /// # Errors
    /// Returns a validation error for a bad draft, or a storage error.
    pub fn register_recipient_on(
        &self,
        draft: RecipientDraft,
        today: NaiveDate,
    ) -> Result<Recipient, KidneyMatchError> {
        draft.validate().map_err(KidneyMatchError::Validation)?;

        let recipient = Recipient::from_draft(draft, today);
        let id = self
            .storage
            .add_recipient(&recipient)
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;

        tracing::info!(
            "Registered recipient {} ({} years on dialysis)",
            id,
            recipient.years_on_dialysis
        );
        Ok(recipient.with_id(id))
    }

    /// Register a donor, deriving the KDPI proxy.
    ///
    /// # Errors
    /// Returns a validation error for a bad draft, or a storage error.
    pub fn register_donor(&self, draft: DonorDraft) -> Result<Donor, KidneyMatchError> {
        draft.validate().map_err(KidneyMatchError::Validation)?;

        let donor = Donor::from_draft(draft);
        let id = self
            .storage
            .add_donor(&donor)
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;

        tracing::info!("Registered donor {} (KDPI {})", id, donor.kdpi);
        Ok(donor.with_id(id))
    }

    /// # Errors
    /// Returns [`KidneyMatchError::NotFound`] if no recipient has this id.
    pub fn delete_recipient(&self, id: i64) -> Result<(), KidneyMatchError> {
        let deleted = self
            .storage
            .delete_recipient(id)
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;
        if !deleted {
            return Err(KidneyMatchError::NotFound(format!("recipient {id}")));
        }
        tracing::info!("Deleted recipient {}", id);
        Ok(())
    }

    /// # Errors
    /// Returns [`KidneyMatchError::NotFound`] if no donor has this id.
    pub fn delete_donor(&self, id: i64) -> Result<(), KidneyMatchError> {
        let deleted = self
            .storage
            .delete_donor(id)
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;
        if !deleted {
            return Err(KidneyMatchError::NotFound(format!("donor {id}")));
        }
        tracing::info!("Deleted donor {}", id);
        Ok(())
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn recipients(&self) -> Result<RecordBatch<Recipient>, KidneyMatchError> {
        self.storage
            .list_recipients()
            .map_err(|e| KidneyMatchError::Storage(e.into()))
    }

    /// # Errors
    /// Returns error if storage operation fails.
    pub fn donors(&self) -> Result<RecordBatch<Donor>, KidneyMatchError> {
        self.storage
            .list_donors()
            .map_err(|e| KidneyMatchError::Storage(e.into()))
    }

    /// Row counts as `(donors, recipients)`.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn counts(&self) -> Result<(usize, usize), KidneyMatchError> {
        let donors = self
            .storage
            .count_donors()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;
        let recipients = self
            .storage
            .count_recipients()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;
        Ok((donors, recipients))
    }
}
