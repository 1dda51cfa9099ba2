//! Recipient priority scoring.

use serde::{Deserialize, Serialize};

use super::clinical::Pra;
use super::recipient::Recipient;

pub const URGENCY_POINTS: f64 = 300.0;
pub const PEDIATRIC_POINTS: f64 = 1.0;

/// PRA bands as `(low, high, bonus)`, inclusive bounds, highest first.
///
/// The steps are uneven and must not be interpolated.
const PRA_BANDS: [(u8, u8, f64); 16] = [
    (100, 100, 202.0),
    (99, 99, 50.09),
    (98, 98, 24.4),
    (97, 97, 17.3),
    (96, 96, 12.17),
    (95, 95, 10.82),
    (90, 94, 6.71),
    (85, 89, 4.05),
    (80, 84, 2.46),
    (75, 79, 1.58),
    (70, 74, 1.09),
    (60, 69, 0.81),
    (50, 59, 0.48),
    (40, 49, 0.34),
    (30, 39, 0.21),
    (20, 29, 0.08),
];

/// Sensitization bonus for a PRA value. Below 20% there is no bonus.
#[must_use]
pub fn pra_bonus(pra: Pra) -> f64 {
    let value = pra.value();
    PRA_BANDS
        .iter()
        .find(|(low, high, _)| (*low..=*high).contains(&value))
        .map_or(0.0, |(_, _, bonus)| *bonus)
}

/// Individual score terms for one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub urgency: f64,
    pub pediatric: f64,
    pub dialysis_years: f64,
    pub pra_bonus: f64,
}

impl ScoreBreakdown {
    #[must_use]
    pub fn for_recipient(recipient: &Recipient) -> Self {
        Self {
            urgency: if recipient.urgent { URGENCY_POINTS } else { 0.0 },
            pediatric: if recipient.is_pediatric() {
                PEDIATRIC_POINTS
            } else {
                0.0
            },
            dialysis_years: f64::from(recipient.years_on_dialysis),
            pra_bonus: pra_bonus(recipient.pra),
        }
    }

    /// Sum of the terms, added in a fixed order.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.urgency + self.pediatric + self.dialysis_years + self.pra_bonus
    }
}

#[must_use]
pub fn priority_score(recipient: &Recipient) -> f64 {
    ScoreBreakdown::for_recipient(recipient).total()
}

/// A recipient with its computed score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecipient {
    pub recipient: Recipient,
    pub priority_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Score every recipient and sort by descending score.
///
/// The sort is stable, so equal scores keep their input order.
#[must_use]
pub fn ranked_recipients(recipients: Vec<Recipient>) -> Vec<RankedRecipient> {
    let mut ranked: Vec<RankedRecipient> = recipients
        .into_iter()
        .map(|recipient| {
            let breakdown = ScoreBreakdown::for_recipient(&recipient);
            RankedRecipient {
                priority_score: breakdown.total(),
                breakdown,
                recipient,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recipient::fixtures;

    fn pra(value: u8) -> Pra {
        Pra::new(value).expect("Valid PRA")
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_pra_table_exact_values() {
        let cases = [
            (100, 202.0),
            (99, 50.09),
            (98, 24.4),
            (97, 17.3),
            (96, 12.17),
            (95, 10.82),
            (94, 6.71),
            (90, 6.71),
            (89, 4.05),
            (85, 4.05),
            (84, 2.46),
            (80, 2.46),
            (79, 1.58),
            (75, 1.58),
            (74, 1.09),
            (70, 1.09),
            (69, 0.81),
            (60, 0.81),
            (59, 0.48),
            (50, 0.48),
            (49, 0.34),
            (40, 0.34),
            (39, 0.21),
            (30, 0.21),
            (29, 0.08),
            (20, 0.08),
            (19, 0.0),
            (0, 0.0),
        ];
        for (value, bonus) in cases {
            assert_eq!(pra_bonus(pra(value)), bonus, "PRA {value}");
        }
    }

    #[test]
    fn test_pra_bonus_non_decreasing() {
        let mut previous = 0.0;
        for value in 0..=100 {
            let bonus = pra_bonus(pra(value));
            assert!(bonus >= previous, "PRA {value} dropped");
            previous = bonus;
        }
    }

    #[test]
    fn test_reference_score() {
        let mut recipient = fixtures::recipient("Child");
        recipient.urgent = true;
        recipient.age = 10;
        recipient.years_on_dialysis = 5;
        recipient.pra = pra(96);
        assert_close(priority_score(&recipient), 318.17);
    }

    #[test]
    fn test_adult_non_urgent_score() {
        let mut recipient = fixtures::recipient("Adult");
        recipient.age = 18;
        recipient.years_on_dialysis = 2;
        recipient.pra = pra(15);
        let breakdown = ScoreBreakdown::for_recipient(&recipient);
        assert_eq!(breakdown.pediatric, 0.0);
        assert_eq!(breakdown.urgency, 0.0);
        assert_close(breakdown.total(), 2.0);
    }

    #[test]
    fn test_ranking_descending_with_stable_ties() {
        let fresh = |name: &str| {
            let mut r = fixtures::recipient(name);
            r.years_on_dialysis = 0;
            r
        };
        let mut a = fresh("A");
        a.years_on_dialysis = 1;
        let mut b = fresh("B");
        b.urgent = true;
        b.years_on_dialysis = 1;
        let mut c = fresh("C");
        c.years_on_dialysis = 1;
        let mut d = fresh("D");
        d.pra = pra(100);

        let ranked = ranked_recipients(vec![a, b, c, d]);
        let names: Vec<&str> = ranked.iter().map(|r| r.recipient.name.as_str()).collect();
        assert_eq!(names, vec!["B", "D", "A", "C"]);
        assert_close(ranked[0].priority_score, 301.0);
    }

    #[test]
    fn test_ranking_empty() {
        assert!(ranked_recipients(Vec::new()).is_empty());
    }
}
