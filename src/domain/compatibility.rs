//! Pairwise donor/recipient compatibility filter.
//!
//! A pair is compatible only when all three checks pass:
//! 1. Blood type: donor `O`, identical types, or recipient `AB`.
//! 2. HLA: every locus matches (see [`BlankLocusPolicy`] for blank loci).
//! 3. Antibody screen: no unacceptable antigen equals a donor HLA value. A
//!    blank token from a field like `"A1,"` equals a blank locus.
//!
//! The blood-type rule is directional and narrower than full
//! ABO compatibility: a `B` donor only reaches `B` and `AB` recipients, an
//! `A` donor never reaches a `B` recipient, and so on.

use serde::{Deserialize, Serialize};

use super::clinical::BloodType;
use super::donor::Donor;
use super::hla::{AntigenSet, BlankLocusPolicy, HlaLocus, HlaTyping};
use super::recipient::Recipient;

/// Blood-type predicate.
#[must_use]
pub fn blood_type_match(donor: BloodType, recipient: BloodType) -> bool {
    donor == BloodType::O || donor == recipient || recipient == BloodType::AB
}

/// HLA predicate: all four loci equal under `policy`.
#[must_use]
pub fn hla_match(donor: &HlaTyping, recipient: &HlaTyping, policy: BlankLocusPolicy) -> bool {
    donor.mismatched_loci(recipient, policy).is_empty()
}

/// Antibody screen: passes when no unacceptable antigen is carried by the donor.
#[must_use]
pub fn antibody_screen(
    unacceptable: &AntigenSet,
    donor: &HlaTyping,
    policy: BlankLocusPolicy,
) -> bool {
    !unacceptable.hits(donor, policy)
}

/// Outcome of each predicate for one donor/recipient pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityCheck {
    pub blood_type: bool,
    pub hla: bool,
    pub antibody_screen: bool,
}

impl CompatibilityCheck {
    /// Run all three predicates.
    #[must_use]
    pub fn evaluate(donor: &Donor, recipient: &Recipient, policy: BlankLocusPolicy) -> Self {
        Self {
            blood_type: blood_type_match(donor.blood_type, recipient.blood_type),
            hla: hla_match(&donor.hla, &recipient.hla, policy),
            antibody_screen: antibody_screen(&recipient.unacceptable_antigens, &donor.hla, policy),
        }
    }

    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.blood_type && self.hla && self.antibody_screen
    }

    /// Short labels for every failed predicate.
    #[must_use]
    pub fn failures(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.blood_type {
            failed.push("blood type");
        }
        if !self.hla {
            failed.push("HLA");
        }
        if !self.antibody_screen {
            failed.push("antibody screen");
        }
        failed
    }
}

/// Compatibility with the default (literal) blank-locus policy.
#[must_use]
pub fn is_compatible(donor: &Donor, recipient: &Recipient) -> bool {
    CompatibilityCheck::evaluate(donor, recipient, BlankLocusPolicy::default()).is_compatible()
}

/// Loci that disqualify a pair, for display.
#[must_use]
pub fn mismatched_loci(donor: &Donor, recipient: &Recipient, policy: BlankLocusPolicy) -> Vec<HlaLocus> {
    donor.hla.mismatched_loci(&recipient.hla, policy)
}

/// One row of the compatibility report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorMatches {
    pub donor_id: Option<i64>,
    pub donor_name: String,
    /// In recipient input order
    pub compatible_recipient_names: Vec<String>,
    pub count: usize,
}

/// Cross every donor with every recipient using the default policy.
#[must_use]
pub fn compatibility_report(donors: &[Donor], recipients: &[Recipient]) -> Vec<DonorMatches> {
    compatibility_report_with_policy(donors, recipients, BlankLocusPolicy::default())
}

/// Cross every donor with every recipient; one row per donor, in input order.
#[must_use]
pub fn compatibility_report_with_policy(
    donors: &[Donor],
    recipients: &[Recipient],
    policy: BlankLocusPolicy,
) -> Vec<DonorMatches> {
    donors
        .iter()
        .map(|donor| {
            let compatible_recipient_names: Vec<String> = recipients
                .iter()
                .filter(|recipient| {
                    CompatibilityCheck::evaluate(donor, recipient, policy).is_compatible()
                })
                .map(|recipient| recipient.name.clone())
                .collect();

            DonorMatches {
                donor_id: donor.id,
                donor_name: donor.name.clone(),
                count: compatible_recipient_names.len(),
                compatible_recipient_names,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::donor::fixtures as donor_fixtures;
    use crate::domain::recipient::fixtures as recipient_fixtures;

    fn pair(donor_bt: BloodType, recipient_bt: BloodType) -> (Donor, Recipient) {
        let mut donor = donor_fixtures::donor("Donor");
        donor.blood_type = donor_bt;
        let mut recipient = recipient_fixtures::recipient("Recipient");
        recipient.blood_type = recipient_bt;
        (donor, recipient)
    }

    #[test]
    fn test_o_donor_reaches_every_recipient() {
        for recipient in BloodType::ALL {
            assert!(blood_type_match(BloodType::O, recipient));
        }
    }

    #[test]
    fn test_ab_recipient_accepts_every_donor() {
        for donor in BloodType::ALL {
            assert!(blood_type_match(donor, BloodType::AB));
        }
    }

    #[test]
    fn test_directional_blood_rules() {
        assert!(!blood_type_match(BloodType::A, BloodType::B));
        assert!(!blood_type_match(BloodType::B, BloodType::A));
        assert!(!blood_type_match(BloodType::AB, BloodType::O));
        assert!(!blood_type_match(BloodType::A, BloodType::O));
        assert!(blood_type_match(BloodType::B, BloodType::B));
    }

    #[test]
    fn test_blood_mismatch_blocks_otherwise_perfect_pair() {
        let (donor, recipient) = pair(BloodType::A, BloodType::B);
        assert_eq!(donor.hla, recipient.hla);
        assert!(recipient.unacceptable_antigens.is_empty());
        assert!(!is_compatible(&donor, &recipient));
    }

    #[test]
    fn test_hla_mismatch_blocks_o_donor() {
        let (mut donor, recipient) = pair(BloodType::O, BloodType::B);
        donor.hla = HlaTyping::new("A1", "B8", "Cw1", "DR3");
        let check = CompatibilityCheck::evaluate(&donor, &recipient, BlankLocusPolicy::Literal);
        assert!(check.blood_type);
        assert!(!check.hla);
        assert!(!check.is_compatible());
        assert_eq!(check.failures(), vec!["HLA"]);
    }

    #[test]
    fn test_any_single_locus_mismatch_fails() {
        let (donor, base) = pair(BloodType::O, BloodType::A);
        for locus in HlaLocus::ALL {
            let mut recipient = base.clone();
            match locus {
                HlaLocus::A => recipient.hla.a.push('x'),
                HlaLocus::B => recipient.hla.b.push('x'),
                HlaLocus::Cw => recipient.hla.cw.push('x'),
                HlaLocus::Dr => recipient.hla.dr.push('x'),
            }
            assert!(!is_compatible(&donor, &recipient), "locus {locus} should block");
            assert_eq!(
                mismatched_loci(&donor, &recipient, BlankLocusPolicy::Literal),
                vec![locus]
            );
        }
    }

    #[test]
    fn test_unacceptable_antigen_blocks() {
        let (donor, mut recipient) = pair(BloodType::O, BloodType::A);
        recipient.unacceptable_antigens = AntigenSet::parse("B44, DR15");
        let check = CompatibilityCheck::evaluate(&donor, &recipient, BlankLocusPolicy::Literal);
        assert!(check.blood_type && check.hla);
        assert!(!check.antibody_screen);
        assert!(!is_compatible(&donor, &recipient));
    }

    #[test]
    fn test_unrelated_antigens_pass_screen() {
        let (donor, mut recipient) = pair(BloodType::O, BloodType::A);
        recipient.unacceptable_antigens = AntigenSet::parse("B44,DR4");
        assert!(is_compatible(&donor, &recipient));
    }

    #[test]
    fn test_blank_loci_follow_policy() {
        let (mut donor, mut recipient) = pair(BloodType::O, BloodType::A);
        donor.hla.cw.clear();
        recipient.hla.cw.clear();
        assert!(is_compatible(&donor, &recipient));
        assert!(!CompatibilityCheck::evaluate(&donor, &recipient, BlankLocusPolicy::NeverMatch)
            .is_compatible());
    }

    #[test]
    fn test_trailing_comma_token_meets_blank_locus() {
        let (mut donor, mut recipient) = pair(BloodType::O, BloodType::A);
        donor.hla.cw.clear();
        recipient.hla.cw.clear();
        recipient.unacceptable_antigens = AntigenSet::parse("A1,");

        let check = CompatibilityCheck::evaluate(&donor, &recipient, BlankLocusPolicy::Literal);
        assert!(check.blood_type && check.hla);
        assert!(!check.antibody_screen);
        assert!(!is_compatible(&donor, &recipient));

        recipient.unacceptable_antigens = AntigenSet::parse("A1");
        assert!(is_compatible(&donor, &recipient));
    }

    #[test]
    fn test_report_lists_names_per_donor_in_order() {
        let mut first = donor_fixtures::donor("Donor O");
        first.id = Some(1);
        let mut second = donor_fixtures::donor("Donor B");
        second.blood_type = BloodType::B;

        let mut r1 = recipient_fixtures::recipient("Ann");
        r1.blood_type = BloodType::B;
        let mut r2 = recipient_fixtures::recipient("Bob");
        r2.blood_type = BloodType::AB;
        let mut r3 = recipient_fixtures::recipient("Cid");
        r3.blood_type = BloodType::A;
        r3.hla.dr = "DR4".to_string();

        let report = compatibility_report(&[first, second], &[r1, r2, r3]);
        assert_eq!(report.len(), 2);

        assert_eq!(report[0].donor_id, Some(1));
        assert_eq!(report[0].compatible_recipient_names, vec!["Ann", "Bob"]);
        assert_eq!(report[0].count, 2);

        assert_eq!(report[1].donor_name, "Donor B");
        assert_eq!(report[1].compatible_recipient_names, vec!["Ann", "Bob"]);
        assert_eq!(report[1].count, 2);
    }

    #[test]
    fn test_report_with_no_recipients() {
        let report = compatibility_report(&[donor_fixtures::donor("Lonely")], &[]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].count, 0);
        assert!(report[0].compatible_recipient_names.is_empty());
    }
}
