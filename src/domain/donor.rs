//! Deceased-donor records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::clinical::{BloodType, Gender, HcvStatus};
use super::hla::HlaTyping;
use super::recipient::MAX_AGE;

/// Simplified donor quality index.
///
/// `10 * age + 2 * diabetes + 3 * hypertension + 2 * dcd`. This is a local
/// proxy kept for compatibility with existing records, not the clinical KDPI.
#[must_use]
pub fn kdpi(age: u32, diabetes: bool, hypertension: bool, dcd: bool) -> u32 {
    age.saturating_mul(10)
        .saturating_add(2 * u32::from(diabetes) + 3 * u32::from(hypertension) + 2 * u32::from(dcd))
}

/// Largest index a donor within the age bound can have.
pub const MAX_KDPI: u32 = 10 * MAX_AGE + 7;

/// Donor as captured by the entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorDraft {
    pub name: String,
    pub hospital: String,
    pub city: String,
    pub admitted_on: Option<NaiveDate>,
    pub admitting_diagnosis: String,
    pub cause_of_death: String,
    pub age: u32,
    pub gender: Gender,
    pub ethnicity: String,
    pub weight_kg: f64,
    pub bmi: f64,
    pub diabetes: bool,
    pub hypertension: bool,
    /// Creatinine in mg/dL
    pub creatinine: f64,
    pub hcv: HcvStatus,
    /// Donation after cardiac death
    pub dcd: bool,
    pub blood_type: BloodType,
    pub hla: HlaTyping,
}

impl DonorDraft {
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
        for (label, value) in [
            ("Weight", self.weight_kg),
            ("BMI", self.bmi),
            ("Creatinine", self.creatinine),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{label} {value} must be a non-negative number"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A stored donor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: Option<i64>,
    pub name: String,
    pub hospital: String,
    pub city: String,
    pub admitted_on: Option<NaiveDate>,
    pub admitting_diagnosis: String,
    pub cause_of_death: String,
    pub age: u32,
    pub gender: Gender,
    pub ethnicity: String,
    pub weight_kg: f64,
    pub bmi: f64,
    pub diabetes: bool,
    pub hypertension: bool,
    pub creatinine: f64,
    pub hcv: HcvStatus,
    pub dcd: bool,
    /// Derived at creation, see [`kdpi`]
    pub kdpi: u32,
    pub blood_type: BloodType,
    pub hla: HlaTyping,
}

impl Donor {
    /// Build a new, unsaved donor, deriving the KDPI proxy.
    #[must_use]
    pub fn from_draft(draft: DonorDraft) -> Self {
        let kdpi = kdpi(draft.age, draft.diabetes, draft.hypertension, draft.dcd);
        Self {
            id: None,
            name: draft.name,
            hospital: draft.hospital,
            city: draft.city,
            admitted_on: draft.admitted_on,
            admitting_diagnosis: draft.admitting_diagnosis,
            cause_of_death: draft.cause_of_death,
            age: draft.age,
            gender: draft.gender,
            ethnicity: draft.ethnicity,
            weight_kg: draft.weight_kg,
            bmi: draft.bmi,
            diabetes: draft.diabetes,
            hypertension: draft.hypertension,
            creatinine: draft.creatinine,
            hcv: draft.hcv,
            dcd: draft.dcd,
            kdpi,
            blood_type: draft.blood_type,
            hla: draft.hla,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn draft(name: &str) -> DonorDraft {
        DonorDraft {
            name: name.to_string(),
            hospital: "General Hospital".to_string(),
            city: "Springfield".to_string(),
            admitted_on: NaiveDate::from_ymd_opt(2024, 5, 30),
            admitting_diagnosis: "Head trauma".to_string(),
            cause_of_death: "Anoxia".to_string(),
            age: 40,
            gender: Gender::Male,
            ethnicity: "Unknown".to_string(),
            weight_kg: 80.0,
            bmi: 25.0,
            diabetes: false,
            hypertension: false,
            creatinine: 1.0,
            hcv: HcvStatus::Negative,
            dcd: false,
            blood_type: BloodType::O,
            hla: HlaTyping::new("A2", "B7", "Cw7", "DR15"),
        }
    }

    pub fn donor(name: &str) -> Donor {
        Donor::from_draft(draft(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kdpi_formula() {
        assert_eq!(kdpi(50, true, false, true), 504);
        assert_eq!(kdpi(50, false, false, false), 500);
        assert_eq!(kdpi(0, true, true, true), 7);
        assert_eq!(kdpi(33, false, true, false), 333);
        assert_eq!(kdpi(MAX_AGE, true, true, true), MAX_KDPI);
        assert_eq!(kdpi(u32::MAX, true, true, true), u32::MAX);
    }

    #[test]
    fn test_from_draft_derives_kdpi() {
        let mut draft = fixtures::draft("Donor One");
        draft.age = 62;
        draft.hypertension = true;
        let donor = Donor::from_draft(draft);
        assert_eq!(donor.kdpi, 623);
        assert!(donor.id.is_none());
    }

    #[test]
    fn test_validation() {
        assert!(fixtures::draft("Valid").validate().is_ok());

        let mut invalid = fixtures::draft("");
        invalid.creatinine = f64::NAN;
        let errors = invalid.validate().expect_err("Should fail");
        assert_eq!(errors.len(), 2);
    }
}
