//! Manage data view: list and delete stored records.
//!
//! Rows the store rejected are listed after the valid records so they can be
//! deleted too.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs},
    Frame,
};

use crate::domain::{yes_no, Donor, Recipient};
use crate::ports::RejectedRecord;
use crate::tui::styles::ClinicalTheme;

use super::{render_notice, render_title};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManageTab {
    #[default]
    Recipients,
    Donors,
}

impl ManageTab {
    #[must_use]
    pub fn toggle(self) -> Self {
        match self {
            Self::Recipients => Self::Donors,
            Self::Donors => Self::Recipients,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Recipients => 0,
            Self::Donors => 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct ManageState {
    pub tab: ManageTab,
    pub recipients: Vec<Recipient>,
    pub donors: Vec<Donor>,
    /// Stored rows that failed validation on the current tab
    pub rejected: Vec<RejectedRecord>,
    /// Set while waiting for the user to confirm a delete
    pub pending_delete: Option<i64>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub table: TableState,
}

impl ManageState {
    fn valid_len(&self) -> usize {
        match self.tab {
            ManageTab::Recipients => self.recipients.len(),
            ManageTab::Donors => self.donors.len(),
        }
    }

    fn len(&self) -> usize {
        self.valid_len() + self.rejected.len()
    }

    fn rejected_at(&self, i: usize) -> Option<&RejectedRecord> {
        self.rejected.get(i.checked_sub(self.valid_len())?)
    }

    /// Keep the selection inside the current list after a reload.
    pub fn clamp_selection(&mut self) {
        let len = self.len();
        let selected = match self.table.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.table.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.len();
        super::step_selection(&mut self.table, len, true);
    }

    pub fn prev(&mut self) {
        let len = self.len();
        super::step_selection(&mut self.table, len, false);
    }

    /// Row id of the highlighted record, valid or rejected.
    #[must_use]
    pub fn selected_id(&self) -> Option<i64> {
        let i = self.table.selected()?;
        if let Some(rejected) = self.rejected_at(i) {
            return Some(rejected.id);
        }
        match self.tab {
            ManageTab::Recipients => self.recipients.get(i)?.id,
            ManageTab::Donors => self.donors.get(i)?.id,
        }
    }

    /// Label of the record awaiting delete confirmation, for the prompt.
    fn pending_name(&self) -> Option<String> {
        let id = self.pending_delete?;
        let name = match self.tab {
            ManageTab::Recipients => self
                .recipients
                .iter()
                .find(|r| r.id == Some(id))
                .map(|r| r.name.clone()),
            ManageTab::Donors => self
                .donors
                .iter()
                .find(|d| d.id == Some(id))
                .map(|d| d.name.clone()),
        };
        name.or_else(|| {
            self.rejected
                .iter()
                .any(|r| r.id == id)
                .then(|| format!("invalid row {id}"))
        })
    }
}

pub fn render_manage(f: &mut Frame, area: Rect, state: &mut ManageState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(2), // Tabs
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_title(f, chunks[0], "Manage Data", "review and delete records");

    let tabs = Tabs::new(vec!["Recipients", "Donors"])
        .select(state.tab.index())
        .style(ClinicalTheme::text_secondary())
        .highlight_style(ClinicalTheme::focused())
        .divider(" │ ");
    f.render_widget(tabs, chunks[1]);

    if let Some(err) = &state.error {
        let p = Paragraph::new(Line::from(vec![
            Span::styled(" ! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ]));
        f.render_widget(p, chunks[2]);
    } else {
        let (header, mut rows, widths) = match state.tab {
            ManageTab::Recipients => recipient_rows(&state.recipients),
            ManageTab::Donors => donor_rows(&state.donors),
        };
        rows.extend(rejected_rows(&state.rejected, header.len()));
        let title = if state.rejected.is_empty() {
            String::new()
        } else {
            format!(" {} invalid rows listed last ", state.rejected.len())
        };

        let table = Table::new(rows, widths)
            .header(Row::new(header).style(ClinicalTheme::header()))
            .row_highlight_style(ClinicalTheme::selected())
            .block(
                Block::default()
                    .title(Span::styled(title, ClinicalTheme::warning()))
                    .borders(Borders::ALL)
                    .border_style(ClinicalTheme::border()),
            );
        f.render_stateful_widget(table, chunks[2], &mut state.table);
    }

    if let Some(name) = state.pending_name() {
        let prompt = Paragraph::new(Line::from(vec![
            Span::styled(format!("Delete {name}? "), ClinicalTheme::warning()),
            Span::styled("[Y] ", ClinicalTheme::key_hint()),
            Span::styled("Confirm ", ClinicalTheme::key_desc()),
            Span::styled("[N] ", ClinicalTheme::key_hint()),
            Span::styled("Cancel", ClinicalTheme::key_desc()),
        ]))
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(ClinicalTheme::border()),
        );
        f.render_widget(prompt, chunks[3]);
    } else {
        render_notice(
            f,
            chunks[3],
            state.notice.as_deref(),
            &[("[Tab] ", "Switch "), ("[↑↓] ", "Select "), ("[Del] ", "Delete "), ("[Esc] ", "Back")],
        );
    }
}

/// Id, a marker and the reason in the last column; the rest stay blank.
fn rejected_rows(rejected: &[RejectedRecord], columns: usize) -> Vec<Row<'static>> {
    rejected
        .iter()
        .map(|r| {
            let mut cells = vec![
                Cell::from(r.id.to_string()),
                Cell::from("(invalid)"),
            ];
            cells.resize(columns.saturating_sub(1), Cell::from(""));
            cells.push(Cell::from(r.reason.to_string()));
            Row::new(cells).style(ClinicalTheme::warning())
        })
        .collect()
}

type TableParts = (Vec<&'static str>, Vec<Row<'static>>, Vec<Constraint>);

fn recipient_rows(recipients: &[Recipient]) -> TableParts {
    let rows = recipients
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(super::id_label(r.id)),
                Cell::from(r.name.clone()),
                Cell::from(r.blood_type.as_str()),
                Cell::from(r.age.to_string()),
                Cell::from(r.pra.to_string()),
                Cell::from(r.years_on_dialysis.to_string()),
                Cell::from(yes_no(r.urgent)),
                Cell::from(r.hla.values().join(" ")),
                Cell::from(r.unacceptable_antigens.to_field()),
            ])
        })
        .collect();
    (
        vec!["ID", "Name", "Blood", "Age", "PRA", "Years", "Urgent", "HLA", "Unacceptable"],
        rows,
        vec![
            Constraint::Length(6),
            Constraint::Min(14),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(20),
            Constraint::Min(12),
        ],
    )
}

fn donor_rows(donors: &[Donor]) -> TableParts {
    let rows = donors
        .iter()
        .map(|d| {
            Row::new(vec![
                Cell::from(super::id_label(d.id)),
                Cell::from(d.name.clone()),
                Cell::from(d.blood_type.as_str()),
                Cell::from(d.age.to_string()),
                Cell::from(d.kdpi.to_string()),
                Cell::from(yes_no(d.dcd)),
                Cell::from(d.hcv.as_str()),
                Cell::from(d.hla.values().join(" ")),
                Cell::from(d.hospital.clone()),
            ])
        })
        .collect();
    (
        vec!["ID", "Name", "Blood", "Age", "KDPI", "DCD", "HCV", "HLA", "Hospital"],
        rows,
        vec![
            Constraint::Length(6),
            Constraint::Min(14),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(9),
            Constraint::Length(20),
            Constraint::Min(12),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{donor_fixtures, recipient_fixtures, InvalidRecord};

    fn state_with_records() -> ManageState {
        ManageState {
            recipients: vec![
                recipient_fixtures::recipient("Ann").with_id(1),
                recipient_fixtures::recipient("Ben").with_id(2),
            ],
            donors: vec![donor_fixtures::donor("Dan").with_id(7)],
            ..ManageState::default()
        }
    }

    #[test]
    fn test_selection_follows_tab() {
        let mut state = state_with_records();
        state.clamp_selection();
        state.next();
        assert_eq!(state.selected_id(), Some(2));

        state.tab = state.tab.toggle();
        state.clamp_selection();
        assert_eq!(state.selected_id(), Some(7));
    }

    #[test]
    fn test_clamp_after_delete() {
        let mut state = state_with_records();
        state.table.select(Some(1));
        state.recipients.pop();
        state.clamp_selection();
        assert_eq!(state.selected_id(), Some(1));

        state.recipients.clear();
        state.clamp_selection();
        assert_eq!(state.selected_id(), None);
    }

    #[test]
    fn test_pending_name() {
        let mut state = state_with_records();
        state.pending_delete = Some(2);
        assert_eq!(state.pending_name().as_deref(), Some("Ben"));
        state.tab = ManageTab::Donors;
        assert_eq!(state.pending_name(), None);
    }

    #[test]
    fn test_rejected_rows_are_selectable() {
        let mut state = state_with_records();
        state.rejected = vec![RejectedRecord {
            id: 9,
            reason: InvalidRecord::new("age", "500 out of range [0, 120]"),
        }];
        state.clamp_selection();
        state.prev();
        assert_eq!(state.selected_id(), Some(9));

        state.pending_delete = Some(9);
        assert_eq!(state.pending_name().as_deref(), Some("invalid row 9"));

        state.next();
        assert_eq!(state.selected_id(), Some(1));
    }
}
