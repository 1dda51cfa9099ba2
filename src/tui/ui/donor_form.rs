//! Donor entry form.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    Frame,
};

use crate::domain::{kdpi, parse_yes_no, BloodType, DonorDraft, Gender, HcvStatus, HlaTyping};
use crate::tui::styles::ClinicalTheme;

use super::form::{render_form, FormField, FormState};

const YES_NO: [&str; 2] = ["No", "Yes"];

/// Donor form state
pub struct DonorFormState {
    pub form: FormState,
}

impl Default for DonorFormState {
    fn default() -> Self {
        Self {
            form: FormState::new(vec![
                FormField::text("name", "Name", "donor name"),
                FormField::text("donor_hospital", "Hospital", "donor hospital"),
                FormField::text("city", "City", ""),
                FormField::date("do_admission", "Date of Admission"),
                FormField::text("admitting_dx", "Admitting Dx", ""),
                FormField::text("cause_of_death", "Cause of Death", ""),
                FormField::integer("age", "Age", "years (0-120)"),
                FormField::choice("gender", "Gender", Gender::ALL.iter().map(|g| g.as_str()).collect()),
                FormField::text("ethnicity", "Ethnicity", ""),
                FormField::decimal("weight", "Weight", "kg"),
                FormField::decimal("bmi", "BMI", "kg/m²"),
                FormField::choice("dm", "Diabetes", YES_NO.to_vec()),
                FormField::choice("htn", "Hypertension", YES_NO.to_vec()),
                FormField::decimal("creat", "Creatinine", "mg/dL"),
                FormField::choice("hcv", "HCV", HcvStatus::ALL.iter().map(|h| h.as_str()).collect()),
                FormField::choice("dcd", "DCD", YES_NO.to_vec()),
                FormField::choice(
                    "blood_type",
                    "Blood Type",
                    BloodType::ALL.iter().map(|b| b.as_str()).collect(),
                ),
                FormField::text("hla_a", "HLA-A", "e.g. A2"),
                FormField::text("hla_b", "HLA-B", "e.g. B7"),
                FormField::text("hla_cw", "HLA-Cw", "e.g. Cw7"),
                FormField::text("hla_dr", "HLA-DR", "e.g. DR15"),
            ]),
        }
    }
}

impl DonorFormState {
    fn flag(&self, key: &'static str) -> Result<bool, String> {
        parse_yes_no(key, self.form.value(key)).map_err(|e| e.to_string())
    }

    /// Validate buffers and convert to a draft.
    ///
    /// # Errors
    /// Returns the first field that fails to parse.
    pub fn to_draft(&self) -> Result<DonorDraft, String> {
        let form = &self.form;
        Ok(DonorDraft {
            name: form.text("name"),
            hospital: form.text("donor_hospital"),
            city: form.text("city"),
            admitted_on: form.date("do_admission")?,
            admitting_diagnosis: form.text("admitting_dx"),
            cause_of_death: form.text("cause_of_death"),
            age: form.integer("age")?,
            gender: form.parsed("gender")?,
            ethnicity: form.text("ethnicity"),
            weight_kg: form.decimal("weight")?,
            bmi: form.decimal("bmi")?,
            diabetes: self.flag("dm")?,
            hypertension: self.flag("htn")?,
            creatinine: form.decimal("creat")?,
            hcv: form.parsed("hcv")?,
            dcd: self.flag("dcd")?,
            blood_type: form.parsed("blood_type")?,
            hla: HlaTyping::new(
                form.value("hla_a"),
                form.value("hla_b"),
                form.value("hla_cw"),
                form.value("hla_dr"),
            ),
        })
    }

    /// KDPI for the current buffers, once age parses.
    #[must_use]
    pub fn preview_kdpi(&self) -> Option<u32> {
        let age = self.form.integer("age").ok()?;
        Some(kdpi(
            age,
            self.flag("dm").ok()?,
            self.flag("htn").ok()?,
            self.flag("dcd").ok()?,
        ))
    }

    /// Load a plausible DCD donor for demonstration.
    pub fn load_sample_data(&mut self) {
        let sample = [
            ("name", "Sample Donor"),
            ("donor_hospital", "General Hospital"),
            ("city", "Springfield"),
            ("do_admission", "2024-05-20"),
            ("admitting_dx", "Intracranial hemorrhage"),
            ("cause_of_death", "CVA"),
            ("age", "47"),
            ("gender", "Male"),
            ("ethnicity", "Not specified"),
            ("weight", "82.5"),
            ("bmi", "26.1"),
            ("dm", "No"),
            ("htn", "Yes"),
            ("creat", "1.1"),
            ("hcv", "Negative"),
            ("dcd", "Yes"),
            ("blood_type", "O"),
            ("hla_a", "A2"),
            ("hla_b", "B44"),
            ("hla_cw", "Cw5"),
            ("hla_dr", "DR4"),
        ];
        for (key, value) in sample {
            self.form.set(key, value);
        }
        self.form.error_message = None;
    }
}

/// Render the donor entry form
pub fn render_donor_form(f: &mut Frame, area: Rect, state: &DonorFormState) {
    let derived = match state.preview_kdpi() {
        Some(value) => Line::from(vec![
            Span::styled(" KDPI: ", ClinicalTheme::text_secondary()),
            Span::styled(value.to_string(), ClinicalTheme::info()),
            Span::styled(
                "  (10 × age + 2 × DM + 3 × HTN + 2 × DCD)",
                ClinicalTheme::text_muted(),
            ),
        ]),
        None => Line::from(vec![Span::styled(
            " KDPI: enter an age",
            ClinicalTheme::text_muted(),
        )]),
    };

    render_form(f, area, "Add Donor", &state.form, derived);
}
