//! Shared data-entry form: field buffers, navigation and rendering.

use chrono::NaiveDate;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::tui::styles::ClinicalTheme;

const DATE_FORMAT: &str = "%Y-%m-%d";
const COLUMNS: usize = 3;
const FIELD_HEIGHT: u16 = 3;

/// What a field accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    /// `YYYY-MM-DD`, may be left blank
    Date,
    /// One of a fixed list; the buffer always holds the current option
    Choice(Vec<&'static str>),
}

/// Form field definition
#[derive(Debug, Clone)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

impl FormField {
    pub fn text(key: &'static str, label: &'static str, hint: &'static str) -> Self {
        Self::with_kind(key, label, hint, FieldKind::Text)
    }

    pub fn integer(key: &'static str, label: &'static str, hint: &'static str) -> Self {
        Self::with_kind(key, label, hint, FieldKind::Integer)
    }

    pub fn decimal(key: &'static str, label: &'static str, hint: &'static str) -> Self {
        Self::with_kind(key, label, hint, FieldKind::Decimal)
    }

    pub fn date(key: &'static str, label: &'static str) -> Self {
        Self::with_kind(key, label, "YYYY-MM-DD", FieldKind::Date)
    }

    pub fn choice(key: &'static str, label: &'static str, options: Vec<&'static str>) -> Self {
        let value = options.first().map(ToString::to_string).unwrap_or_default();
        Self {
            key,
            label,
            hint: "←/→ to change",
            kind: FieldKind::Choice(options),
            value,
        }
    }

    fn with_kind(key: &'static str, label: &'static str, hint: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            hint,
            kind,
            value: String::new(),
        }
    }

    fn accepts(&self, c: char) -> bool {
        match self.kind {
            FieldKind::Text => !c.is_control(),
            FieldKind::Integer => c.is_ascii_digit(),
            FieldKind::Decimal => c.is_ascii_digit() || c == '.',
            FieldKind::Date => c.is_ascii_digit() || c == '-',
            FieldKind::Choice(_) => false,
        }
    }

    fn reset(&mut self) {
        self.value.zeroize();
        if let FieldKind::Choice(options) = &self.kind {
            if let Some(first) = options.first() {
                self.value.push_str(first);
            }
        }
    }
}

/// Form buffers plus cursor and feedback.
#[derive(Debug, Clone)]
pub struct FormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
    pub status_message: Option<String>,
}

impl FormState {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            selected_field: 0,
            error_message: None,
            status_message: None,
        }
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Add a character to the current field if its kind accepts it.
    pub fn input_char(&mut self, c: char) {
        let field = &mut self.fields[self.selected_field];
        if field.accepts(c) {
            field.value.push(c);
            self.error_message = None;
            self.status_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        let field = &mut self.fields[self.selected_field];
        if !matches!(field.kind, FieldKind::Choice(_)) {
            field.value.pop();
        }
    }

    pub fn clear_field(&mut self) {
        self.fields[self.selected_field].reset();
    }

    /// Step a choice field forward or backward through its options.
    pub fn cycle_choice(&mut self, forward: bool) {
        let field = &mut self.fields[self.selected_field];
        let FieldKind::Choice(options) = &field.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let current = options.iter().position(|o| *o == field.value).unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        field.value = options[next].to_string();
        self.error_message = None;
    }

    /// Raw buffer for a field key; empty for unknown keys.
    #[must_use]
    pub fn value(&self, key: &str) -> &str {
        self.field(key).map_or("", |f| f.value.as_str())
    }

    /// Overwrite a field buffer, used for sample data.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.key == key) {
            field.value.zeroize();
            field.value.push_str(value);
        }
    }

    fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }

    fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.field(key).map_or(key, |f| f.label)
    }

    /// Trimmed text value.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        self.value(key).trim().to_string()
    }

    /// # Errors
    /// Returns a message naming the field if the buffer is not a whole number.
    pub fn integer(&self, key: &str) -> Result<u32, String> {
        self.value(key)
            .trim()
            .parse()
            .map_err(|_| format!("{}: Invalid whole number", self.label(key)))
    }

    /// Decimal value; a blank buffer reads as zero.
    ///
    /// # Errors
    /// Returns a message naming the field if the buffer is not a number.
    pub fn decimal(&self, key: &str) -> Result<f64, String> {
        let raw = self.value(key).trim();
        if raw.is_empty() {
            return Ok(0.0);
        }
        raw.parse()
            .map_err(|_| format!("{}: Invalid number", self.label(key)))
    }

    /// Date value; a blank buffer reads as `None`.
    ///
    /// # Errors
    /// Returns a message naming the field if the buffer is not `YYYY-MM-DD`.
    pub fn date(&self, key: &str) -> Result<Option<NaiveDate>, String> {
        let raw = self.value(key).trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| format!("{}: Expected YYYY-MM-DD", self.label(key)))
    }

    /// Parse a choice buffer through the domain's `FromStr`.
    ///
    /// # Errors
    /// Returns the parse error as a message.
    pub fn parsed<T>(&self, key: &str) -> Result<T, String>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.value(key).parse().map_err(|e: T::Err| e.to_string())
    }

    /// Wipe all field buffers and reset the cursor.
    pub fn clear_sensitive(&mut self) {
        for field in &mut self.fields {
            field.reset();
        }
        self.error_message = None;
        self.selected_field = 0;
    }
}

impl Drop for FormState {
    fn drop(&mut self) {
        for field in &mut self.fields {
            field.value.zeroize();
        }
    }
}

/// Render a form with a header, a field grid, a derived-value line and a footer.
pub fn render_form(f: &mut Frame, area: Rect, title: &str, state: &FormState, derived: Line<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Fields
            Constraint::Length(3), // Derived values
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled(title.to_string(), ClinicalTheme::title()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );
    f.render_widget(header, chunks[0]);

    render_field_grid(f, chunks[1], state);

    let derived_block = Block::default()
        .title(Span::styled(" Derived ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());
    f.render_widget(Paragraph::new(derived).block(derived_block), chunks[2]);

    render_form_footer(f, chunks[3], state);
}

fn render_field_grid(f: &mut Frame, area: Rect, state: &FormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, COLUMNS as u32); COLUMNS])
        .margin(1)
        .split(area);

    let per_column = state.fields.len().div_ceil(COLUMNS);
    for (col, chunk) in state.fields.chunks(per_column.max(1)).enumerate() {
        render_field_column(f, columns[col], chunk, col * per_column, state.selected_field);
    }
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(FIELD_HEIGHT))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (ClinicalTheme::border_focused(), ClinicalTheme::focused())
        } else {
            (ClinicalTheme::border(), ClinicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value_display = if field.value.is_empty() {
            Span::styled(field.hint, ClinicalTheme::text_muted())
        } else if matches!(field.kind, FieldKind::Choice(_)) {
            Span::styled(format!("‹ {} ›", field.value), ClinicalTheme::text())
        } else {
            Span::styled(field.value.as_str(), ClinicalTheme::text())
        };

        let content = Paragraph::new(Line::from(vec![
            Span::raw(" "),
            value_display,
            if is_selected && !matches!(field.kind, FieldKind::Choice(_)) {
                Span::styled("▌", ClinicalTheme::cursor())
            } else {
                Span::raw("")
            },
        ]))
        .block(block);

        f.render_widget(content, chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &FormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ])
    } else if let Some(status) = &state.status_message {
        Line::from(vec![
            Span::styled("OK ", ClinicalTheme::success()),
            Span::styled(status.clone(), ClinicalTheme::success()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", ClinicalTheme::key_hint()),
            Span::styled("Navigate ", ClinicalTheme::key_desc()),
            Span::styled("[←→] ", ClinicalTheme::key_hint()),
            Span::styled("Choose ", ClinicalTheme::key_desc()),
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Save ", ClinicalTheme::key_desc()),
            Span::styled("[F2] ", ClinicalTheme::key_hint()),
            Span::styled("Sample Data ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Back", ClinicalTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_form() -> FormState {
        FormState::new(vec![
            FormField::text("name", "Name", "full name"),
            FormField::integer("age", "Age", "years"),
            FormField::decimal("bmi", "BMI", "kg/m²"),
            FormField::date("dod", "Dialysis Start"),
            FormField::choice("urgent", "Urgent", vec!["No", "Yes"]),
        ])
    }

    #[test]
    fn test_navigation_wraps() {
        let mut form = sample_form();
        form.prev_field();
        assert_eq!(form.selected_field, 4);
        form.next_field();
        assert_eq!(form.selected_field, 0);
    }

    #[test]
    fn test_input_is_filtered_by_kind() {
        let mut form = sample_form();
        form.next_field();
        for c in "4x2".chars() {
            form.input_char(c);
        }
        assert_eq!(form.value("age"), "42");
        assert_eq!(form.integer("age").expect("Should parse"), 42);

        form.selected_field = 4;
        form.input_char('Y');
        assert_eq!(form.value("urgent"), "No");
    }

    #[test]
    fn test_choice_cycles_both_ways() {
        let mut form = sample_form();
        form.selected_field = 4;
        form.cycle_choice(true);
        assert_eq!(form.value("urgent"), "Yes");
        form.cycle_choice(true);
        assert_eq!(form.value("urgent"), "No");
        form.cycle_choice(false);
        assert_eq!(form.value("urgent"), "Yes");
    }

    #[test]
    fn test_blank_optional_values() {
        let form = sample_form();
        assert_eq!(form.decimal("bmi").expect("Should parse"), 0.0);
        assert_eq!(form.date("dod").expect("Should parse"), None);
        assert!(form.integer("age").is_err());
    }

    #[test]
    fn test_bad_date_names_field() {
        let mut form = sample_form();
        form.set("dod", "2024-13-01");
        let err = form.date("dod").expect_err("Should reject");
        assert!(err.starts_with("Dialysis Start"));
    }

    #[test]
    fn test_clear_sensitive_resets_buffers() {
        let mut form = sample_form();
        form.set("name", "Jane Roe");
        form.set("urgent", "Yes");
        form.selected_field = 3;

        form.clear_sensitive();
        assert_eq!(form.value("name"), "");
        assert_eq!(form.value("urgent"), "No");
        assert_eq!(form.selected_field, 0);
    }
}
