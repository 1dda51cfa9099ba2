//! HLA typing and unacceptable-antigen sets.
//!
//! HLA codes are opaque strings. No case folding or whitespace trimming is
//! applied to loci: `"A2"` and `"a2"` are different antigens.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four typed HLA loci.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HlaLocus {
    A,
    B,
    Cw,
    Dr,
}

impl HlaLocus {
    pub const ALL: [HlaLocus; 4] = [Self::A, Self::B, Self::Cw, Self::Dr];
}

impl fmt::Display for HlaLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "HLA-A",
            Self::B => "HLA-B",
            Self::Cw => "HLA-Cw",
            Self::Dr => "HLA-DR",
        };
        f.write_str(name)
    }
}

/// How a blank locus takes part in the HLA comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlankLocusPolicy {
    /// Plain string equality: two blank loci match each other.
    #[default]
    Literal,
    /// A blank locus on either side never matches.
    NeverMatch,
}

impl BlankLocusPolicy {
    fn loci_match(self, donor: &str, recipient: &str) -> bool {
        match self {
            Self::Literal => donor == recipient,
            Self::NeverMatch => {
                !donor.trim().is_empty() && !recipient.trim().is_empty() && donor == recipient
            }
        }
    }
}

impl fmt::Display for BlankLocusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal => f.write_str("literal"),
            Self::NeverMatch => f.write_str("never-match"),
        }
    }
}

impl FromStr for BlankLocusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" => Ok(Self::Literal),
            "never-match" | "never_match" | "strict" => Ok(Self::NeverMatch),
            other => Err(format!(
                "unknown blank HLA policy {other:?} (expected \"literal\" or \"never-match\")"
            )),
        }
    }
}

/// The four HLA loci of a donor or recipient.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HlaTyping {
    pub a: String,
    pub b: String,
    pub cw: String,
    pub dr: String,
}

impl HlaTyping {
    #[must_use]
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        cw: impl Into<String>,
        dr: impl Into<String>,
    ) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            cw: cw.into(),
            dr: dr.into(),
        }
    }

    #[must_use]
    pub fn get(&self, locus: HlaLocus) -> &str {
        match locus {
            HlaLocus::A => &self.a,
            HlaLocus::B => &self.b,
            HlaLocus::Cw => &self.cw,
            HlaLocus::Dr => &self.dr,
        }
    }

    /// Values in locus order A, B, Cw, DR.
    #[must_use]
    pub fn values(&self) -> [&str; 4] {
        [&self.a, &self.b, &self.cw, &self.dr]
    }

    /// Loci that do not match between `self` (donor) and `recipient`.
    #[must_use]
    pub fn mismatched_loci(&self, recipient: &HlaTyping, policy: BlankLocusPolicy) -> Vec<HlaLocus> {
        HlaLocus::ALL
            .into_iter()
            .filter(|&locus| !policy.loci_match(self.get(locus), recipient.get(locus)))
            .collect()
    }

    /// Whether any locus equals `antigen` exactly.
    #[must_use]
    pub fn carries(&self, antigen: &str) -> bool {
        self.values().contains(&antigen)
    }
}

/// Antigens a recipient must not receive.
///
/// Persisted as a comma-separated string and parsed once when a record is
/// loaded. Tokens are trimmed. An empty field is an empty set, but a blank
/// token inside a non-empty field (`"A1,"`) is kept and matches a blank locus
/// under [`BlankLocusPolicy::Literal`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AntigenSet(BTreeSet<String>);

impl AntigenSet {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        raw.split(',').collect()
    }

    /// Comma-joined form for storage.
    #[must_use]
    pub fn to_field(&self) -> String {
        let joined = self.0.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        // A lone blank token must not collapse into an empty field.
        if joined.is_empty() && !self.0.is_empty() {
            return ",".to_string();
        }
        joined
    }

    /// Whether any token equals one of the donor's loci under `policy`.
    #[must_use]
    pub fn hits(&self, donor: &HlaTyping, policy: BlankLocusPolicy) -> bool {
        self.iter().any(|antigen| match policy {
            BlankLocusPolicy::Literal => donor.carries(antigen),
            BlankLocusPolicy::NeverMatch => !antigen.is_empty() && donor.carries(antigen),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, antigen: &str) -> bool {
        self.0.contains(antigen)
    }
}

impl<S: Into<String>> FromIterator<S> for AntigenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| {
                    let s: String = s.into();
                    s.trim().to_string()
                })
                .collect(),
        )
    }
}

impl fmt::Display for AntigenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iter().collect::<Vec<_>>().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_antigen_parse_trims_tokens() {
        let set = AntigenSet::parse(" A2, B44 ,DR4");
        assert_eq!(set.len(), 3);
        assert!(set.contains("A2"));
        assert!(set.contains("B44"));
        assert!(set.contains("DR4"));
    }

    #[test]
    fn test_antigen_parse_empty_field() {
        assert!(AntigenSet::parse("").is_empty());
    }

    #[test]
    fn test_antigen_parse_keeps_blank_tokens() {
        let trailing = AntigenSet::parse("A1,");
        assert_eq!(trailing.len(), 2);
        assert!(trailing.contains("A1"));
        assert!(trailing.contains(""));

        let spaces = AntigenSet::parse(" , ,");
        assert_eq!(spaces.len(), 1);
        assert!(spaces.contains(""));

        assert_eq!(AntigenSet::parse(&spaces.to_field()), spaces);
        assert_eq!(AntigenSet::parse(&trailing.to_field()), trailing);
    }

    #[test]
    fn test_blank_token_hits_blank_locus_only_when_literal() {
        let donor = HlaTyping::new("A2", "B7", "", "DR15");
        let antigens = AntigenSet::parse("A1,");
        assert!(antigens.hits(&donor, BlankLocusPolicy::Literal));
        assert!(!antigens.hits(&donor, BlankLocusPolicy::NeverMatch));

        let typed = HlaTyping::new("A2", "B7", "Cw7", "DR15");
        assert!(!antigens.hits(&typed, BlankLocusPolicy::Literal));
    }

    #[test]
    fn test_antigen_field_reparses_to_same_set() {
        let set = AntigenSet::parse("B8, A1, A1");
        assert_eq!(set.len(), 2);
        assert_eq!(AntigenSet::parse(&set.to_field()), set);
    }

    #[test]
    fn test_mismatched_loci_is_case_sensitive() {
        let donor = HlaTyping::new("A2", "B7", "Cw7", "DR15");
        let recipient = HlaTyping::new("a2", "B7", "Cw7", "DR15 ");
        assert_eq!(
            donor.mismatched_loci(&recipient, BlankLocusPolicy::Literal),
            vec![HlaLocus::A, HlaLocus::Dr]
        );
    }

    #[test]
    fn test_blank_locus_policies() {
        let donor = HlaTyping::new("A2", "", "Cw7", "DR15");
        let recipient = HlaTyping::new("A2", "", "Cw7", "DR15");
        assert!(donor
            .mismatched_loci(&recipient, BlankLocusPolicy::Literal)
            .is_empty());
        assert_eq!(
            donor.mismatched_loci(&recipient, BlankLocusPolicy::NeverMatch),
            vec![HlaLocus::B]
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "never-match".parse::<BlankLocusPolicy>().expect("Should parse"),
            BlankLocusPolicy::NeverMatch
        );
        assert_eq!(
            "Literal".parse::<BlankLocusPolicy>().expect("Should parse"),
            BlankLocusPolicy::Literal
        );
        assert!("wildcard".parse::<BlankLocusPolicy>().is_err());
    }
}
