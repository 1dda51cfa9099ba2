//! Waiting-list recipient records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::clinical::{BloodType, DialysisModality, Gender, Pra};
use super::hla::{AntigenSet, HlaTyping};

/// Days counted as one year on dialysis.
pub const DAYS_PER_DIALYSIS_YEAR: i64 = 365;

/// Upper bound accepted for a recorded age.
pub const MAX_AGE: u32 = 120;

/// Whole years between dialysis start and `today`.
///
/// Zero when the start date is missing or lies in the future.
#[must_use]
pub fn years_on_dialysis(dialysis_start: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match dialysis_start {
        Some(start) if start <= today => {
            let days = (today - start).num_days();
            u32::try_from(days / DAYS_PER_DIALYSIS_YEAR).unwrap_or(u32::MAX)
        }
        _ => 0,
    }
}

/// Recipient as captured by the entry form, before derived fields exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientDraft {
    pub name: String,
    pub mrn: String,
    pub age: u32,
    pub bmi: f64,
    pub gender: Gender,
    pub blood_type: BloodType,
    pub pra: Pra,
    pub listed_on: Option<NaiveDate>,
    pub dialysis_start: Option<NaiveDate>,
    pub modality: DialysisModality,
    pub urgent: bool,
    pub epts: f64,
    pub hla: HlaTyping,
    pub unacceptable_antigens: AntigenSet,
}

impl RecipientDraft {
    /// Validate free-form values that the type system does not constrain.
    ///
    /// # Errors
    /// Returns every problem found, one message each.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Name is required".to_string());
        }
        if self.age > MAX_AGE {
            errors.push(format!("Age {} out of range [0, {MAX_AGE}]", self.age));
        }
        if !self.bmi.is_finite() || self.bmi < 0.0 {
            errors.push(format!("BMI {} must be a non-negative number", self.bmi));
        }
        if !self.epts.is_finite() || self.epts < 0.0 {
            errors.push(format!("EPTS {} must be a non-negative number", self.epts));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A stored recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Row identifier; `None` until persisted
    pub id: Option<i64>,
    pub name: String,
    /// Medical record number
    pub mrn: String,
    pub age: u32,
    pub bmi: f64,
    pub gender: Gender,
    pub blood_type: BloodType,
    pub pra: Pra,
    /// Date of listing
    pub listed_on: Option<NaiveDate>,
    pub dialysis_start: Option<NaiveDate>,
    /// Derived at entry time, never recomputed on read
    pub years_on_dialysis: u32,
    pub modality: DialysisModality,
    pub urgent: bool,
    /// Expected post-transplant survival score (recorded, not scored)
    pub epts: f64,
    pub hla: HlaTyping,
    pub unacceptable_antigens: AntigenSet,
}

impl Recipient {
    /// Build a new, unsaved recipient, deriving years on dialysis as of `today`.
    #[must_use]
    pub fn from_draft(draft: RecipientDraft, today: NaiveDate) -> Self {
        let years_on_dialysis = years_on_dialysis(draft.dialysis_start, today);
        Self {
            id: None,
            name: draft.name,
            mrn: draft.mrn,
            age: draft.age,
            bmi: draft.bmi,
            gender: draft.gender,
            blood_type: draft.blood_type,
            pra: draft.pra,
            listed_on: draft.listed_on,
            dialysis_start: draft.dialysis_start,
            years_on_dialysis,
            modality: draft.modality,
            urgent: draft.urgent,
            epts: draft.epts,
            hla: draft.hla,
            unacceptable_antigens: draft.unacceptable_antigens,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Under the pediatric age cut-off used by the scorer.
    #[must_use]
    pub fn is_pediatric(&self) -> bool {
        self.age < 18
    }
}
