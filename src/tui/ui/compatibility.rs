//! Compatibility check view: one row per donor.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::application::{CompatibilityReport, PairOutcome};
use crate::tui::styles::ClinicalTheme;

use super::{render_notice, render_title};

#[derive(Debug, Default)]
pub struct CompatibilityState {
    pub report: Option<CompatibilityReport>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub table: TableState,
    /// Per-recipient outcomes for the selected donor, when requested
    pub outcomes: Option<Vec<PairOutcome>>,
}

impl CompatibilityState {
    pub fn set_report(&mut self, report: CompatibilityReport) {
        let selected = (!report.rows.is_empty()).then_some(0);
        self.report = Some(report);
        self.error = None;
        self.outcomes = None;
        self.table.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.report.as_ref().map_or(0, |r| r.rows.len());
        super::step_selection(&mut self.table, len, true);
        self.outcomes = None;
    }

    pub fn prev(&mut self) {
        let len = self.report.as_ref().map_or(0, |r| r.rows.len());
        super::step_selection(&mut self.table, len, false);
        self.outcomes = None;
    }

    /// Row id of the highlighted donor.
    #[must_use]
    pub fn selected_donor_id(&self) -> Option<i64> {
        let i = self.table.selected()?;
        self.report.as_ref()?.rows.get(i)?.donor_id
    }
}

pub fn render_compatibility(f: &mut Frame, area: Rect, state: &mut CompatibilityState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Table
            Constraint::Length(8), // Selected donor detail
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_title(f, chunks[0], "Compatibility Check", "blood type · HLA · antibody screen");

    if let Some(err) = &state.error {
        let p = Paragraph::new(Line::from(vec![
            Span::styled(" ! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ]));
        f.render_widget(p, chunks[1]);
    } else if let Some(report) = &state.report {
        let rows: Vec<Row> = report
            .rows
            .iter()
            .map(|row| {
                Row::new(vec![
                    Cell::from(super::id_label(row.donor_id)),
                    Cell::from(row.donor_name.clone()),
                    Cell::from(row.compatible_recipient_names.join(", ")),
                    Cell::from(Span::styled(
                        row.count.to_string(),
                        ClinicalTheme::match_count(row.count),
                    )),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Percentage(25),
                Constraint::Min(20),
                Constraint::Length(7),
            ],
        )
        .header(
            Row::new(vec!["Donor ID", "Donor", "Compatible Recipients", "Count"])
                .style(ClinicalTheme::header()),
        )
        .row_highlight_style(ClinicalTheme::selected())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        );

        f.render_stateful_widget(table, chunks[1], &mut state.table);

        let selected = state.table.selected().and_then(|i| report.rows.get(i));
        let detail = match (&state.outcomes, selected) {
            (_, None) => vec![Line::from(Span::styled(
                "No donors registered.",
                ClinicalTheme::text_muted(),
            ))],
            (Some(outcomes), Some(_)) => outcome_lines(outcomes),
            (None, Some(row)) => {
                let names = if row.compatible_recipient_names.is_empty() {
                    "none".to_string()
                } else {
                    row.compatible_recipient_names.join(", ")
                };
                vec![
                    Line::from(vec![
                        Span::styled(format!("{}: ", row.donor_name), ClinicalTheme::text()),
                        Span::styled(names, ClinicalTheme::match_count(row.count)),
                    ]),
                    Line::from(Span::styled(
                        "Press [Enter] for per-recipient reasons.",
                        ClinicalTheme::text_muted(),
                    )),
                ]
            }
        };
        let rejected = report.rejected_donors.len() + report.rejected_recipients.len();
        let mut lines = detail;
        if rejected > 0 {
            lines.push(Line::from(Span::styled(
                format!(
                    "{} donor and {} recipient rows skipped as invalid (see Manage Data)",
                    report.rejected_donors.len(),
                    report.rejected_recipients.len()
                ),
                ClinicalTheme::warning(),
            )));
        }
        let block = Block::default()
            .title(Span::styled(" Selected Donor ", ClinicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border());
        f.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            chunks[2],
        );
    }

    render_notice(
        f,
        chunks[3],
        state.notice.as_deref(),
        &[
            ("[↑↓] ", "Select "),
            ("[Enter] ", "Reasons "),
            ("[R] ", "Refresh "),
            ("[E] ", "Export JSON "),
            ("[Esc] ", "Back"),
        ],
    );
}

fn outcome_lines(outcomes: &[PairOutcome]) -> Vec<Line<'static>> {
    if outcomes.is_empty() {
        return vec![Line::from(Span::styled(
            "No recipients registered.",
            ClinicalTheme::text_muted(),
        ))];
    }

    outcomes
        .iter()
        .map(|outcome| {
            let verdict = if outcome.is_compatible() {
                Span::styled("compatible", ClinicalTheme::success())
            } else {
                let mut reasons = outcome.check.failures().join(", ");
                if !outcome.mismatched_loci.is_empty() {
                    let loci: Vec<String> =
                        outcome.mismatched_loci.iter().map(ToString::to_string).collect();
                    reasons.push_str(&format!(" [{}]", loci.join(" ")));
                }
                Span::styled(reasons, ClinicalTheme::danger())
            };
            Line::from(vec![
                Span::styled(format!("{}: ", outcome.recipient_name), ClinicalTheme::text()),
                verdict,
            ])
        })
        .collect()
}
