//! Closed clinical enumerations and boundary validation.
//!
//! Records arrive from forms and from the database as text. Everything that
//! has a fixed vocabulary is parsed here into an enum so the matching logic
//! never compares raw strings for these fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A record failed validation at the store or form boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct InvalidRecord {
    /// Column or form field that failed
    pub field: &'static str,
    /// Human-readable cause
    pub reason: String,
}

impl InvalidRecord {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, "missing value")
    }
}

/// ABO blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    O,
    A,
    B,
    AB,
}

impl BloodType {
    /// All variants, in the order offered by the entry forms.
    pub const ALL: [BloodType; 4] = [Self::O, Self::A, Self::B, Self::AB];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::O => "O",
            Self::A => "A",
            Self::B => "B",
            Self::AB => "AB",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = InvalidRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "O" => Ok(Self::O),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "AB" => Ok(Self::AB),
            other => Err(InvalidRecord::new(
                "blood_type",
                format!("unknown blood type {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Self::Male, Self::Female];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = InvalidRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Male" => Ok(Self::Male),
            "Female" => Ok(Self::Female),
            other => Err(InvalidRecord::new(
                "gender",
                format!("unknown gender {other:?}"),
            )),
        }
    }
}

/// Dialysis modality of a waiting recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialysisModality {
    Hemodialysis,
    PeritonealDialysis,
}

impl DialysisModality {
    pub const ALL: [DialysisModality; 2] = [Self::Hemodialysis, Self::PeritonealDialysis];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hemodialysis => "Hemodialysis",
            Self::PeritonealDialysis => "Peritoneal Dialysis",
        }
    }
}

impl FromStr for DialysisModality {
    type Err = InvalidRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Hemodialysis" => Ok(Self::Hemodialysis),
            "Peritoneal Dialysis" => Ok(Self::PeritonealDialysis),
            other => Err(InvalidRecord::new(
                "hd_pd",
                format!("unknown dialysis modality {other:?}"),
            )),
        }
    }
}

/// Donor hepatitis C serology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HcvStatus {
    Positive,
    Negative,
}

impl HcvStatus {
    pub const ALL: [HcvStatus; 2] = [Self::Positive, Self::Negative];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
        }
    }
}

impl FromStr for HcvStatus {
    type Err = InvalidRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Positive" => Ok(Self::Positive),
            "Negative" => Ok(Self::Negative),
            other => Err(InvalidRecord::new(
                "hcv",
                format!("unknown HCV status {other:?}"),
            )),
        }
    }
}

/// Parse a stored `"Yes"`/`"No"` flag.
///
/// # Errors
/// Returns [`InvalidRecord`] for anything other than the two literals.
pub fn parse_yes_no(field: &'static str, value: &str) -> Result<bool, InvalidRecord> {
    match value.trim() {
        "Yes" => Ok(true),
        "No" => Ok(false),
        other => Err(InvalidRecord::new(
            field,
            format!("expected \"Yes\" or \"No\", got {other:?}"),
        )),
    }
}

/// Stored text for a flag.
#[must_use]
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Panel-reactive antibody percentage, 0 to 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pra(u8);

impl Pra {
    pub const MAX: u8 = 100;

    /// # Errors
    /// Returns [`InvalidRecord`] if the value exceeds 100.
    pub fn new(value: u8) -> Result<Self, InvalidRecord> {
        if value > Self::MAX {
            return Err(InvalidRecord::new(
                "pra",
                format!("{value} out of range [0, 100]"),
            ));
        }
        Ok(Self(value))
    }

    /// Build from a wider integer as read from storage.
    ///
    /// # Errors
    /// Returns [`InvalidRecord`] if the value is negative or above 100.
    pub fn from_i64(value: i64) -> Result<Self, InvalidRecord> {
        u8::try_from(value)
            .map_err(|_| InvalidRecord::new("pra", format!("{value} out of range [0, 100]")))
            .and_then(Self::new)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Pra {
    type Error = InvalidRecord;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pra> for u8 {
    fn from(pra: Pra) -> Self {
        pra.0
    }
}

impl fmt::Display for Pra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blood_type_roundtrip_text() {
        for bt in BloodType::ALL {
            let parsed: BloodType = bt.as_str().parse().expect("Should parse");
            assert_eq!(parsed, bt);
        }
    }

    #[test]
    fn test_blood_type_rejects_unknown() {
        let err = "A+".parse::<BloodType>().expect_err("Should reject");
        assert_eq!(err.field, "blood_type");
        assert!("ab".parse::<BloodType>().is_err());
    }

    #[test]
    fn test_yes_no_is_strict() {
        assert!(parse_yes_no("urgent", "Yes").expect("Should parse"));
        assert!(!parse_yes_no("urgent", "No").expect("Should parse"));
        assert!(parse_yes_no("urgent", "yes").is_err());
        assert!(parse_yes_no("urgent", "").is_err());
        assert_eq!(yes_no(true), "Yes");
    }

    #[test]
    fn test_modality_text_matches_storage() {
        assert_eq!(
            "Peritoneal Dialysis".parse::<DialysisModality>().expect("Should parse"),
            DialysisModality::PeritonealDialysis
        );
        assert_eq!(DialysisModality::Hemodialysis.as_str(), "Hemodialysis");
    }

    #[test]
    fn test_pra_bounds() {
        assert_eq!(Pra::new(0).expect("Should accept").value(), 0);
        assert_eq!(Pra::new(100).expect("Should accept").value(), 100);
        assert!(Pra::new(101).is_err());
        assert!(Pra::from_i64(-1).is_err());
        assert!(Pra::from_i64(300).is_err());
        assert_eq!(Pra::from_i64(42).expect("Should accept").value(), 42);
    }
}
