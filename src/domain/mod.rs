//! Domain layer: Core business types and logic.
//!
//! Pure Rust types with no I/O. Records are validated when they cross into
//! this layer, so the compatibility filter and the priority scorer are total.

mod clinical;
pub mod compatibility;
mod donor;
mod hla;
pub mod priority;
mod recipient;

pub use clinical::{
    parse_yes_no, yes_no, BloodType, DialysisModality, Gender, HcvStatus, InvalidRecord, Pra,
};
pub use compatibility::{
    compatibility_report, compatibility_report_with_policy, is_compatible, CompatibilityCheck,
    DonorMatches,
};
pub use donor::{kdpi, Donor, DonorDraft, MAX_KDPI};
pub use hla::{AntigenSet, BlankLocusPolicy, HlaLocus, HlaTyping};
pub use priority::{pra_bonus, priority_score, ranked_recipients, RankedRecipient, ScoreBreakdown};
pub use recipient::{years_on_dialysis, Recipient, RecipientDraft, MAX_AGE};

#[cfg(test)]
pub(crate) use donor::fixtures as donor_fixtures;
#[cfg(test)]
pub(crate) use recipient::fixtures as recipient_fixtures;
