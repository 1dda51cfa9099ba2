//! Matching service: compatibility report and priority ranking.
//!
//! Every call loads the full record set from the store and computes a fresh
//! snapshot. Rows the store rejected are carried alongside the results so
//! the caller can show how many records were left out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::compatibility::mismatched_loci;
use crate::domain::{
    compatibility_report_with_policy, ranked_recipients, BlankLocusPolicy, CompatibilityCheck,
    Donor, DonorMatches, HlaLocus, RankedRecipient, Recipient,
};
use crate::ports::{RecordStore, RejectedRecord};
use crate::KidneyMatchError;

/// Per-donor compatibility rows plus rejected input rows.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityReport {
    pub rows: Vec<DonorMatches>,
    pub rejected_donors: Vec<RejectedRecord>,
    pub rejected_recipients: Vec<RejectedRecord>,
}

impl CompatibilityReport {
    /// Donors with at least one compatible recipient.
    #[must_use]
    pub fn donors_with_matches(&self) -> usize {
        self.rows.iter().filter(|row| row.count > 0).count()
    }
}

/// Recipients by descending priority plus rejected input rows.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub rows: Vec<RankedRecipient>,
    pub rejected: Vec<RejectedRecord>,
}

/// One recipient's outcome against a chosen donor.
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub recipient_id: Option<i64>,
    pub recipient_name: String,
    pub check: CompatibilityCheck,
    pub mismatched_loci: Vec<HlaLocus>,
}

impl PairOutcome {
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.check.is_compatible()
    }
}

/// A rejected row in exported form.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub table: &'static str,
    pub id: i64,
    pub reason: String,
}

impl RejectedRow {
    fn from_record(table: &'static str, record: &RejectedRecord) -> Self {
        Self {
            table,
            id: record.id,
            reason: record.reason.to_string(),
        }
    }
}

/// Everything the reports screen shows, as one serializable document.
#[derive(Debug, Clone, Serialize)]
pub struct MatchingSnapshot {
    pub generated_at: DateTime<Utc>,
    pub blank_locus_policy: BlankLocusPolicy,
    pub compatibility: Vec<DonorMatches>,
    pub ranking: Vec<RankedRecipient>,
    pub rejected: Vec<RejectedRow>,
}

/// Service for computing compatibility and priority reports.
pub struct MatchingService<S>
where
    S: RecordStore,
{
    storage: Arc<S>,
    policy: BlankLocusPolicy,
}

impl<S> MatchingService<S>
where
    S: RecordStore,
    S::Error: Into<crate::adapters::StorageError>,
{
    pub fn new(storage: Arc<S>, policy: BlankLocusPolicy) -> Self {
        Self { storage, policy }
    }

    #[must_use]
    pub fn policy(&self) -> BlankLocusPolicy {
        self.policy
    }

    /// Cross all donors with all recipients.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub fn compatibility_report(&self) -> Result<CompatibilityReport, KidneyMatchError> {
        let donors = self
            .storage
            .list_donors()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;
        let recipients = self
            .storage
            .list_recipients()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;

        let rows =
            compatibility_report_with_policy(&donors.records, &recipients.records, self.policy);

        let report = CompatibilityReport {
            rows,
            rejected_donors: donors.rejected,
            rejected_recipients: recipients.rejected,
        };

        tracing::info!(
            "Compatibility report: {} donors x {} recipients, {} donors with matches, {} rows rejected",
            donors.records.len(),
            recipients.records.len(),
            report.donors_with_matches(),
            report.rejected_donors.len() + report.rejected_recipients.len()
        );

        Ok(report)
    }

    /// Score and sort all recipients.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub fn ranked_recipients(&self) -> Result<Ranking, KidneyMatchError> {
        let recipients = self
            .storage
            .list_recipients()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;

        let ranking = Ranking {
            rows: ranked_recipients(recipients.records),
            rejected: recipients.rejected,
        };

        tracing::info!(
            "Ranked {} recipients ({} rejected)",
            ranking.rows.len(),
            ranking.rejected.len()
        );

        Ok(ranking)
    }

    /// Predicate breakdown for one pair, for explaining a result.
    #[must_use]
    pub fn explain(&self, donor: &Donor, recipient: &Recipient) -> CompatibilityCheck {
        CompatibilityCheck::evaluate(donor, recipient, self.policy)
    }

    /// Every recipient's outcome against one donor, in recipient order.
    ///
    /// # Errors
    /// Returns [`KidneyMatchError::NotFound`] if no valid donor has this id.
    pub fn explain_donor(&self, donor_id: i64) -> Result<Vec<PairOutcome>, KidneyMatchError> {
        let donors = self
            .storage
            .list_donors()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;
        let donor = donors
            .records
            .iter()
            .find(|d| d.id == Some(donor_id))
            .ok_or_else(|| KidneyMatchError::NotFound(format!("donor {donor_id}")))?;
        let recipients = self
            .storage
            .list_recipients()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;

        Ok(recipients
            .records
            .iter()
            .map(|recipient| PairOutcome {
                recipient_id: recipient.id,
                recipient_name: recipient.name.clone(),
                check: self.explain(donor, recipient),
                mismatched_loci: mismatched_loci(donor, recipient, self.policy),
            })
            .collect())
    }

    /// Build both reports from one read of the store.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub fn snapshot(&self) -> Result<MatchingSnapshot, KidneyMatchError> {
        let donors = self
            .storage
            .list_donors()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;
        let recipients = self
            .storage
            .list_recipients()
            .map_err(|e| KidneyMatchError::Storage(e.into()))?;

        let rejected = donors
            .rejected
            .iter()
            .map(|r| RejectedRow::from_record("donors", r))
            .chain(
                recipients
                    .rejected
                    .iter()
                    .map(|r| RejectedRow::from_record("recipients", r)),
            )
            .collect();

        let compatibility =
            compatibility_report_with_policy(&donors.records, &recipients.records, self.policy);

        Ok(MatchingSnapshot {
            generated_at: Utc::now(),
            blank_locus_policy: self.policy,
            compatibility,
            ranking: ranked_recipients(recipients.records),
            rejected,
        })
    }

    /// Write a snapshot as pretty JSON into `dir` and return the file path.
    ///
    /// # Errors
    /// Returns error if the store cannot be read or the file cannot be written.
    pub fn export_json(&self, dir: &Path) -> Result<PathBuf, KidneyMatchError> {
        let snapshot = self.snapshot()?;

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "matching-report-{}.json",
            snapshot.generated_at.format("%Y%m%d-%H%M%S")
        ));
        std::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?)?;

        tracing::info!(
            "Exported matching report ({} donors, {} recipients)",
            snapshot.compatibility.len(),
            snapshot.ranking.len()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStore;
    use crate::domain::{donor_fixtures, recipient_fixtures, AntigenSet, BloodType, Pra};

    fn create_test_service(policy: BlankLocusPolicy) -> (Arc<SqliteStore>, MatchingService<SqliteStore>) {
        let storage = Arc::new(SqliteStore::in_memory().expect("Should create db"));
        let service = MatchingService::new(storage.clone(), policy);
        (storage, service)
    }

    fn seed(storage: &SqliteStore) {
        let donor_o = donor_fixtures::donor("Donor O");
        let mut donor_a = donor_fixtures::donor("Donor A");
        donor_a.blood_type = BloodType::A;
        storage.add_donor(&donor_o).expect("Should save");
        storage.add_donor(&donor_a).expect("Should save");

        let mut ann = recipient_fixtures::recipient("Ann");
        ann.blood_type = BloodType::B;
        let mut ben = recipient_fixtures::recipient("Ben");
        ben.unacceptable_antigens = AntigenSet::parse("DR15");
        let mut cat = recipient_fixtures::recipient("Cat");
        cat.urgent = true;
        cat.pra = Pra::new(100).expect("Valid PRA");
        storage.add_recipient(&ann).expect("Should save");
        storage.add_recipient(&ben).expect("Should save");
        storage.add_recipient(&cat).expect("Should save");
    }

    #[test]
    fn test_empty_store() {
        let (_, service) = create_test_service(BlankLocusPolicy::Literal);
        let report = service.compatibility_report().expect("Should build");
        assert!(report.rows.is_empty());
        let ranking = service.ranked_recipients().expect("Should rank");
        assert!(ranking.rows.is_empty());
    }

    #[test]
    fn test_compatibility_report_from_store() {
        let (storage, service) = create_test_service(BlankLocusPolicy::Literal);
        seed(&storage);

        let report = service.compatibility_report().expect("Should build");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].donor_name, "Donor O");
        assert_eq!(report.rows[0].compatible_recipient_names, vec!["Ann", "Cat"]);
        assert_eq!(report.rows[1].donor_name, "Donor A");
        assert_eq!(report.rows[1].compatible_recipient_names, vec!["Cat"]);
        assert_eq!(report.donors_with_matches(), 2);
    }

    #[test]
    fn test_ranking_from_store() {
        let (storage, service) = create_test_service(BlankLocusPolicy::Literal);
        seed(&storage);

        let ranking = service.ranked_recipients().expect("Should rank");
        let names: Vec<&str> = ranking
            .rows
            .iter()
            .map(|r| r.recipient.name.as_str())
            .collect();
        // Ann and Ben tie on dialysis years alone and keep store order.
        assert_eq!(names, vec!["Cat", "Ann", "Ben"]);
        assert!((ranking.rows[0].priority_score - 504.0).abs() < 1e-9);
    }

    #[test]
    fn test_policy_is_applied() {
        let (storage, service) = create_test_service(BlankLocusPolicy::NeverMatch);
        let mut donor = donor_fixtures::donor("Blank Cw");
        donor.hla.cw.clear();
        let mut recipient = recipient_fixtures::recipient("Blank Cw too");
        recipient.hla.cw.clear();
        storage.add_donor(&donor).expect("Should save");
        storage.add_recipient(&recipient).expect("Should save");

        let report = service.compatibility_report().expect("Should build");
        assert_eq!(report.rows[0].count, 0);
        assert!(!service.explain(&donor, &recipient).hla);
    }

    #[test]
    fn test_rejected_rows_are_reported() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let db_path = dir.path().join("matching.db");
        let storage = Arc::new(SqliteStore::new(&db_path).expect("Should create db"));
        let service = MatchingService::new(storage.clone(), BlankLocusPolicy::Literal);
        seed(&storage);

        // Corrupt one row from outside the store.
        let raw = rusqlite::Connection::open(&db_path).expect("Should open db");
        raw.execute("UPDATE recipients SET blood_type = 'Z' WHERE name = 'Ben'", [])
            .expect("Should update");
        drop(raw);

        let report = service.compatibility_report().expect("Should build");
        assert_eq!(report.rejected_recipients.len(), 1);
        assert_eq!(report.rejected_recipients[0].reason.field, "blood_type");
        assert!(report.rejected_donors.is_empty());

        let snapshot = service.snapshot().expect("Should snapshot");
        assert_eq!(snapshot.ranking.len(), 2);
        assert_eq!(snapshot.rejected.len(), 1);
        assert_eq!(snapshot.rejected[0].table, "recipients");
    }

    #[test]
    fn test_explain_donor() {
        let (storage, service) = create_test_service(BlankLocusPolicy::Literal);
        seed(&storage);

        let outcomes = service.explain_donor(2).expect("Should explain");
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].recipient_name, "Ann");
        assert_eq!(outcomes[0].check.failures(), vec!["blood type"]);
        assert_eq!(outcomes[1].check.failures(), vec!["antibody screen"]);
        assert!(outcomes[2].is_compatible());
        assert!(outcomes.iter().all(|o| o.mismatched_loci.is_empty()));

        assert!(matches!(
            service.explain_donor(99),
            Err(KidneyMatchError::NotFound(_))
        ));
    }

    #[test]
    fn test_export_json() {
        let (storage, service) = create_test_service(BlankLocusPolicy::Literal);
        seed(&storage);
        let dir = tempfile::tempdir().expect("Should create temp dir");

        let path = service
            .export_json(&dir.path().join("exports"))
            .expect("Should export");
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).expect("Should read");
        let value: serde_json::Value = serde_json::from_str(&content).expect("Should parse");
        assert_eq!(value["compatibility"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["ranking"][0]["recipient"]["name"], "Cat");
        assert_eq!(value["blank_locus_policy"], "Literal");
    }
}
