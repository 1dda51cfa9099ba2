//! Recipient entry form.

use chrono::NaiveDate;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    Frame,
};

use crate::domain::{
    parse_yes_no, years_on_dialysis, AntigenSet, BloodType, DialysisModality, Gender, HlaTyping,
    Pra, RecipientDraft,
};
use crate::tui::styles::ClinicalTheme;

use super::form::{render_form, FormField, FormState};

/// Recipient form state
pub struct RecipientFormState {
    pub form: FormState,
}

impl Default for RecipientFormState {
    fn default() -> Self {
        Self {
            form: FormState::new(vec![
                FormField::text("name", "Name", "full name"),
                FormField::text("mrn", "MRN", "medical record number"),
                FormField::integer("age", "Age", "years (0-120)"),
                FormField::decimal("bmi", "BMI", "kg/m²"),
                FormField::choice("gender", "Gender", Gender::ALL.iter().map(|g| g.as_str()).collect()),
                FormField::choice(
                    "blood_type",
                    "Blood Type",
                    BloodType::ALL.iter().map(|b| b.as_str()).collect(),
                ),
                FormField::integer("pra", "PRA", "% (0-100)"),
                FormField::date("dol", "Date of Listing"),
                FormField::date("dod", "Dialysis Start"),
                FormField::choice(
                    "hd_pd",
                    "Modality",
                    DialysisModality::ALL.iter().map(|m| m.as_str()).collect(),
                ),
                FormField::choice("urgent", "Urgent", vec!["No", "Yes"]),
                FormField::decimal("epts", "EPTS", "%"),
                FormField::text("hla_a", "HLA-A", "e.g. A2"),
                FormField::text("hla_b", "HLA-B", "e.g. B7"),
                FormField::text("hla_cw", "HLA-Cw", "e.g. Cw7"),
                FormField::text("hla_dr", "HLA-DR", "e.g. DR15"),
                FormField::text("unacceptable", "Unacceptable Antigens", "comma separated"),
            ]),
        }
    }
}

impl RecipientFormState {
    /// Validate buffers and convert to a draft.
    ///
    /// # Errors
    /// Returns the first field that fails to parse.
    pub fn to_draft(&self) -> Result<RecipientDraft, String> {
        let form = &self.form;
        let pra = form.integer("pra")?;
        let pra = u8::try_from(pra)
            .map_err(|_| format!("PRA {pra} out of range [0, 100]"))
            .and_then(|v| Pra::new(v).map_err(|e| e.to_string()))?;

        Ok(RecipientDraft {
            name: form.text("name"),
            mrn: form.text("mrn"),
            age: form.integer("age")?,
            bmi: form.decimal("bmi")?,
            gender: form.parsed("gender")?,
            blood_type: form.parsed("blood_type")?,
            pra,
            listed_on: form.date("dol")?,
            dialysis_start: form.date("dod")?,
            modality: form.parsed("hd_pd")?,
            urgent: parse_yes_no("urgent", form.value("urgent")).map_err(|e| e.to_string())?,
            epts: form.decimal("epts")?,
            hla: HlaTyping::new(
                form.value("hla_a"),
                form.value("hla_b"),
                form.value("hla_cw"),
                form.value("hla_dr"),
            ),
            unacceptable_antigens: AntigenSet::parse(form.value("unacceptable")),
        })
    }

    /// Years on dialysis for the current dialysis-start buffer, if it parses.
    #[must_use]
    pub fn preview_years(&self, today: NaiveDate) -> Option<u32> {
        self.form
            .date("dod")
            .ok()
            .map(|start| years_on_dialysis(start, today))
    }

    /// Load a plausible sensitized recipient for demonstration.
    pub fn load_sample_data(&mut self) {
        let sample = [
            ("name", "Sample Recipient"),
            ("mrn", "MRN-0001"),
            ("age", "52"),
            ("bmi", "27.4"),
            ("gender", "Female"),
            ("blood_type", "O"),
            ("pra", "98"),
            ("dol", "2021-03-15"),
            ("dod", "2019-11-02"),
            ("hd_pd", "Hemodialysis"),
            ("urgent", "No"),
            ("epts", "41"),
            ("hla_a", "A2"),
            ("hla_b", "B44"),
            ("hla_cw", "Cw5"),
            ("hla_dr", "DR4"),
            ("unacceptable", "A1, B8, DR17"),
        ];
        for (key, value) in sample {
            self.form.set(key, value);
        }
        self.form.error_message = None;
    }
}

/// Render the recipient entry form
pub fn render_recipient_form(f: &mut Frame, area: Rect, state: &RecipientFormState, today: NaiveDate) {
    let derived = match state.preview_years(today) {
        Some(years) => Line::from(vec![
            Span::styled(" Years on dialysis: ", ClinicalTheme::text_secondary()),
            Span::styled(years.to_string(), ClinicalTheme::info()),
        ]),
        None => Line::from(vec![Span::styled(
            " Years on dialysis: enter a dialysis start date",
            ClinicalTheme::text_muted(),
        )]),
    };

    render_form(f, area, "Add Recipient", &state.form, derived);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("Valid date")
    }

    #[test]
    fn test_sample_data_converts() {
        let mut state = RecipientFormState::default();
        state.load_sample_data();

        let draft = state.to_draft().expect("Should convert");
        assert_eq!(draft.age, 52);
        assert_eq!(draft.blood_type, BloodType::O);
        assert_eq!(draft.pra.value(), 98);
        assert_eq!(draft.hla.dr, "DR4");
        assert_eq!(draft.unacceptable_antigens.len(), 3);
        assert!(draft.unacceptable_antigens.contains("B8"));
        assert!(!draft.urgent);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_hla_input_kept_as_entered() {
        let mut state = RecipientFormState::default();
        state.load_sample_data();
        state.form.set("hla_a", " A2");
        state.form.set("hla_cw", "");

        let draft = state.to_draft().expect("Should convert");
        assert_eq!(draft.hla.a, " A2");
        assert_eq!(draft.hla.cw, "");
    }

    #[test]
    fn test_preview_years() {
        let mut state = RecipientFormState::default();
        assert_eq!(state.preview_years(date(2024, 1, 1)), Some(0));

        state.form.set("dod", "2020-01-01");
        assert_eq!(state.preview_years(date(2024, 1, 1)), Some(4));

        state.form.set("dod", "2020-01");
        assert_eq!(state.preview_years(date(2024, 1, 1)), None);
    }

    #[test]
    fn test_pra_out_of_range() {
        let mut state = RecipientFormState::default();
        state.load_sample_data();
        state.form.set("pra", "101");
        assert!(state.to_draft().is_err());

        state.form.set("pra", "999");
        assert!(state.to_draft().is_err());
    }

    #[test]
    fn test_missing_age_is_reported() {
        let mut state = RecipientFormState::default();
        state.load_sample_data();
        state.form.set("age", "");
        let err = state.to_draft().expect_err("Should reject");
        assert!(err.contains("Age"));
    }
}
