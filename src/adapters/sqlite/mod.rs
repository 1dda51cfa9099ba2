//! SQLite adapter: Implementation of RecordStore.
//!
//! The schema matches the `kidney_matching.db` layout used by earlier
//! versions of the tool, so existing databases open unchanged:
//! - dates are `YYYY-MM-DD` text
//! - flags are `"Yes"` / `"No"` text
//! - unacceptable antigens are comma-joined text
//!
//! Rows that cannot be decoded are reported as [`RejectedRecord`]s rather
//! than failing the whole load.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::types::FromSql;
use rusqlite::{named_params, params, Connection, Row};

use crate::domain::{
    kdpi, parse_yes_no, yes_no, AntigenSet, Donor, HlaTyping, InvalidRecord, Pra, Recipient,
    MAX_AGE, MAX_KDPI,
};
use crate::ports::{RecordBatch, RecordStore, RejectedRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// SQLite record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS recipients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                mrn TEXT,
                age INTEGER,
                bmi REAL,
                gender TEXT,
                blood_type TEXT,
                dol DATE,
                dod DATE,
                hd_pd TEXT,
                urgent TEXT,
                years_dialysis INTEGER,
                epts REAL,
                pra INTEGER,
                hla_a TEXT,
                hla_b TEXT,
                hla_cw TEXT,
                hla_dr TEXT,
                unacceptable_antigen TEXT
            );

            CREATE TABLE IF NOT EXISTS donors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                donor_hospital TEXT,
                city TEXT,
                do_admission DATE,
                admitting_dx TEXT,
                cause_of_death TEXT,
                age INTEGER,
                gender TEXT,
                ethnicity TEXT,
                weight REAL,
                bmi REAL,
                dm TEXT,
                htn TEXT,
                creat REAL,
                hcv TEXT,
                dcd TEXT,
                kdpi REAL,
                blood_type TEXT,
                hla_a TEXT,
                hla_b TEXT,
                hla_cw TEXT,
                hla_dr TEXT
            );
            ",
        )?;

        Ok(())
    }

    fn count_rows(&self, table: &str) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn column<T: FromSql>(row: &Row<'_>, field: &'static str) -> Result<Option<T>, InvalidRecord> {
    row.get::<_, Option<T>>(field)
        .map_err(|e| InvalidRecord::new(field, e.to_string()))
}

fn required<T: FromSql>(row: &Row<'_>, field: &'static str) -> Result<T, InvalidRecord> {
    column(row, field)?.ok_or_else(|| InvalidRecord::missing(field))
}

fn text(row: &Row<'_>, field: &'static str) -> Result<String, InvalidRecord> {
    Ok(column::<String>(row, field)?.unwrap_or_default())
}

fn real(row: &Row<'_>, field: &'static str) -> Result<f64, InvalidRecord> {
    Ok(column::<f64>(row, field)?.unwrap_or(0.0))
}

fn parsed<T>(row: &Row<'_>, field: &'static str) -> Result<T, InvalidRecord>
where
    T: std::str::FromStr<Err = InvalidRecord>,
{
    required::<String>(row, field)?.parse()
}

fn flag(row: &Row<'_>, field: &'static str) -> Result<bool, InvalidRecord> {
    parse_yes_no(field, &required::<String>(row, field)?)
}

fn age(row: &Row<'_>) -> Result<u32, InvalidRecord> {
    let value: i64 = required(row, "age")?;
    u32::try_from(value)
        .ok()
        .filter(|age| *age <= MAX_AGE)
        .ok_or_else(|| {
            InvalidRecord::new("age", format!("{value} out of range [0, {MAX_AGE}]"))
        })
}

fn date(row: &Row<'_>, field: &'static str) -> Result<Option<NaiveDate>, InvalidRecord> {
    column::<String>(row, field)?
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            // Some writers append a time component; only the date part is meaningful.
            let day = s.trim().get(..10).unwrap_or(s.trim());
            NaiveDate::parse_from_str(day, DATE_FORMAT)
                .map_err(|e| InvalidRecord::new(field, format!("{s:?}: {e}")))
        })
        .transpose()
}

fn hla(row: &Row<'_>) -> Result<HlaTyping, InvalidRecord> {
    Ok(HlaTyping::new(
        required::<String>(row, "hla_a")?,
        required::<String>(row, "hla_b")?,
        required::<String>(row, "hla_cw")?,
        required::<String>(row, "hla_dr")?,
    ))
}

fn recipient_from_row(row: &Row<'_>) -> Result<Recipient, InvalidRecord> {
    let years_on_dialysis: i64 = column(row, "years_dialysis")?.unwrap_or(0);

    Ok(Recipient {
        id: Some(required(row, "id")?),
        name: required(row, "name")?,
        mrn: text(row, "mrn")?,
        age: age(row)?,
        bmi: real(row, "bmi")?,
        gender: parsed(row, "gender")?,
        blood_type: parsed(row, "blood_type")?,
        pra: Pra::from_i64(required(row, "pra")?)?,
        listed_on: date(row, "dol")?,
        dialysis_start: date(row, "dod")?,
        years_on_dialysis: u32::try_from(years_on_dialysis).map_err(|_| {
            InvalidRecord::new("years_dialysis", format!("{years_on_dialysis} is negative"))
        })?,
        modality: parsed(row, "hd_pd")?,
        urgent: flag(row, "urgent")?,
        epts: real(row, "epts")?,
        hla: hla(row)?,
        unacceptable_antigens: AntigenSet::parse(&text(row, "unacceptable_antigen")?),
    })
}

fn donor_from_row(row: &Row<'_>) -> Result<Donor, InvalidRecord> {
    let stored_kdpi = column::<f64>(row, "kdpi")?;

    let mut donor = Donor {
        id: Some(required(row, "id")?),
        name: required(row, "name")?,
        hospital: text(row, "donor_hospital")?,
        city: text(row, "city")?,
        admitted_on: date(row, "do_admission")?,
        admitting_diagnosis: text(row, "admitting_dx")?,
        cause_of_death: text(row, "cause_of_death")?,
        age: age(row)?,
        gender: parsed(row, "gender")?,
        ethnicity: text(row, "ethnicity")?,
        weight_kg: real(row, "weight")?,
        bmi: real(row, "bmi")?,
        diabetes: flag(row, "dm")?,
        hypertension: flag(row, "htn")?,
        creatinine: real(row, "creat")?,
        hcv: parsed(row, "hcv")?,
        dcd: flag(row, "dcd")?,
        kdpi: 0,
        blood_type: parsed(row, "blood_type")?,
        hla: hla(row)?,
    };

    donor.kdpi = match stored_kdpi {
        Some(value) if value.is_finite() && (0.0..=f64::from(MAX_KDPI)).contains(&value) => {
            value.round() as u32
        }
        Some(value) => {
            return Err(InvalidRecord::new(
                "kdpi",
                format!("{value} out of range [0, {MAX_KDPI}]"),
            ))
        }
        // Re-derive a missing index from the row's own risk factors.
        None => kdpi(donor.age, donor.diabetes, donor.hypertension, donor.dcd),
    };

    Ok(donor)
}

/// Split decoded rows into valid records and rejected rows.
fn collect_batch<T>(
    table: &str,
    rows: Vec<(i64, Result<T, InvalidRecord>)>,
) -> RecordBatch<T> {
    let mut batch = RecordBatch::default();
    for (id, decoded) in rows {
        match decoded {
            Ok(record) => batch.records.push(record),
            Err(reason) => {
                tracing::warn!("Skipping invalid {} row {}: {}", table, id, reason);
                batch.rejected.push(RejectedRecord { id, reason });
            }
        }
    }
    batch
}

impl RecordStore for SqliteStore {
    type Error = StorageError;

    fn list_donors(&self) -> Result<RecordBatch<Donor>, Self::Error> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r"
            SELECT id, name, donor_hospital, city, do_admission, admitting_dx,
                   cause_of_death, age, gender, ethnicity, weight, bmi, dm, htn,
                   creat, hcv, dcd, kdpi, blood_type, hla_a, hla_b, hla_cw, hla_dr
            FROM donors
            ORDER BY id ASC
            ",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get("id")?;
                Ok((id, donor_from_row(row)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let batch = collect_batch("donors", rows);
        tracing::debug!(
            "Loaded {} donors ({} rejected)",
            batch.records.len(),
            batch.rejected.len()
        );
        Ok(batch)
    }

    fn list_recipients(&self) -> Result<RecordBatch<Recipient>, Self::Error> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r"
            SELECT id, name, mrn, age, bmi, gender, blood_type, dol, dod, hd_pd,
                   urgent, years_dialysis, epts, pra, hla_a, hla_b, hla_cw, hla_dr,
                   unacceptable_antigen
            FROM recipients
            ORDER BY id ASC
            ",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get("id")?;
                Ok((id, recipient_from_row(row)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let batch = collect_batch("recipients", rows);
        tracing::debug!(
            "Loaded {} recipients ({} rejected)",
            batch.records.len(),
            batch.rejected.len()
        );
        Ok(batch)
    }

    fn add_donor(&self, donor: &Donor) -> Result<i64, Self::Error> {
        let conn = self.conn()?;

        conn.execute(
            r"
            INSERT INTO donors (
                name, donor_hospital, city, do_admission, admitting_dx, cause_of_death,
                age, gender, ethnicity, weight, bmi, dm, htn, creat, hcv, dcd, kdpi,
                blood_type, hla_a, hla_b, hla_cw, hla_dr
            ) VALUES (
                :name, :donor_hospital, :city, :do_admission, :admitting_dx, :cause_of_death,
                :age, :gender, :ethnicity, :weight, :bmi, :dm, :htn, :creat, :hcv, :dcd, :kdpi,
                :blood_type, :hla_a, :hla_b, :hla_cw, :hla_dr
            )
            ",
            named_params! {
                ":name": donor.name,
                ":donor_hospital": donor.hospital,
                ":city": donor.city,
                ":do_admission": format_date(donor.admitted_on),
                ":admitting_dx": donor.admitting_diagnosis,
                ":cause_of_death": donor.cause_of_death,
                ":age": donor.age,
                ":gender": donor.gender.as_str(),
                ":ethnicity": donor.ethnicity,
                ":weight": donor.weight_kg,
                ":bmi": donor.bmi,
                ":dm": yes_no(donor.diabetes),
                ":htn": yes_no(donor.hypertension),
                ":creat": donor.creatinine,
                ":hcv": donor.hcv.as_str(),
                ":dcd": yes_no(donor.dcd),
                ":kdpi": f64::from(donor.kdpi),
                ":blood_type": donor.blood_type.as_str(),
                ":hla_a": donor.hla.a,
                ":hla_b": donor.hla.b,
                ":hla_cw": donor.hla.cw,
                ":hla_dr": donor.hla.dr,
            },
        )?;

        let id = conn.last_insert_rowid();
        tracing::info!("Saved donor {} to storage", id);
        Ok(id)
    }

    fn add_recipient(&self, recipient: &Recipient) -> Result<i64, Self::Error> {
        let conn = self.conn()?;

        conn.execute(
            r"
            INSERT INTO recipients (
                name, mrn, age, bmi, gender, blood_type, pra, dol, dod, hd_pd,
                urgent, years_dialysis, epts, hla_a, hla_b, hla_cw, hla_dr, unacceptable_antigen
            ) VALUES (
                :name, :mrn, :age, :bmi, :gender, :blood_type, :pra, :dol, :dod, :hd_pd,
                :urgent, :years_dialysis, :epts, :hla_a, :hla_b, :hla_cw, :hla_dr, :unacceptable_antigen
            )
            ",
            named_params! {
                ":name": recipient.name,
                ":mrn": recipient.mrn,
                ":age": recipient.age,
                ":bmi": recipient.bmi,
                ":gender": recipient.gender.as_str(),
                ":blood_type": recipient.blood_type.as_str(),
                ":pra": recipient.pra.value(),
                ":dol": format_date(recipient.listed_on),
                ":dod": format_date(recipient.dialysis_start),
                ":hd_pd": recipient.modality.as_str(),
                ":urgent": yes_no(recipient.urgent),
                ":years_dialysis": recipient.years_on_dialysis,
                ":epts": recipient.epts,
                ":hla_a": recipient.hla.a,
                ":hla_b": recipient.hla.b,
                ":hla_cw": recipient.hla.cw,
                ":hla_dr": recipient.hla.dr,
                ":unacceptable_antigen": recipient.unacceptable_antigens.to_field(),
            },
        )?;

        let id = conn.last_insert_rowid();
        tracing::info!("Saved recipient {} to storage", id);
        Ok(id)
    }

    fn delete_donor(&self, id: i64) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM donors WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn delete_recipient(&self, id: i64) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM recipients WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn count_donors(&self) -> Result<usize, Self::Error> {
        self.count_rows("donors")
    }

    fn count_recipients(&self) -> Result<usize, Self::Error> {
        self.count_rows("recipients")
    }
}
