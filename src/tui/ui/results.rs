//! View results: recipients ranked by priority score.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::application::Ranking;
use crate::domain::yes_no;
use crate::tui::styles::ClinicalTheme;

use super::{render_notice, render_title};

#[derive(Debug, Default)]
pub struct ResultsState {
    pub ranking: Option<Ranking>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub table: TableState,
}

impl ResultsState {
    pub fn set_ranking(&mut self, ranking: Ranking) {
        let selected = (!ranking.rows.is_empty()).then_some(0);
        self.ranking = Some(ranking);
        self.error = None;
        self.table.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.ranking.as_ref().map_or(0, |r| r.rows.len());
        super::step_selection(&mut self.table, len, true);
    }

    pub fn prev(&mut self) {
        let len = self.ranking.as_ref().map_or(0, |r| r.rows.len());
        super::step_selection(&mut self.table, len, false);
    }
}

pub fn render_results(f: &mut Frame, area: Rect, state: &mut ResultsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Table
            Constraint::Length(4), // Score breakdown
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_title(f, chunks[0], "View Results", "recipients by priority score");

    if let Some(err) = &state.error {
        let p = Paragraph::new(Line::from(vec![
            Span::styled(" ! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ]));
        f.render_widget(p, chunks[1]);
    } else if let Some(ranking) = &state.ranking {
        let rows: Vec<Row> = ranking
            .rows
            .iter()
            .enumerate()
            .map(|(rank, ranked)| {
                let r = &ranked.recipient;
                Row::new(vec![
                    Cell::from((rank + 1).to_string()),
                    Cell::from(super::id_label(r.id)),
                    Cell::from(r.name.clone()),
                    Cell::from(r.blood_type.as_str()),
                    Cell::from(r.age.to_string()),
                    Cell::from(r.pra.to_string()),
                    Cell::from(r.years_on_dialysis.to_string()),
                    Cell::from(Span::styled(yes_no(r.urgent), ClinicalTheme::flag(r.urgent))),
                    Cell::from(Span::styled(
                        format!("{:.2}", ranked.priority_score),
                        ClinicalTheme::priority(ranked.priority_score),
                    )),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(6),
                Constraint::Min(16),
                Constraint::Length(6),
                Constraint::Length(5),
                Constraint::Length(5),
                Constraint::Length(7),
                Constraint::Length(7),
                Constraint::Length(9),
            ],
        )
        .header(
            Row::new(vec![
                "Rank", "ID", "Name", "Blood", "Age", "PRA", "Years", "Urgent", "Score",
            ])
            .style(ClinicalTheme::header()),
        )
        .row_highlight_style(ClinicalTheme::selected())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        );

        f.render_stateful_widget(table, chunks[1], &mut state.table);

        let mut lines = match state.table.selected().and_then(|i| ranking.rows.get(i)) {
            Some(ranked) => {
                let b = &ranked.breakdown;
                vec![Line::from(vec![
                    Span::styled("Urgency ", ClinicalTheme::text_secondary()),
                    Span::styled(format!("{:.0}", b.urgency), ClinicalTheme::text()),
                    Span::styled("  Pediatric ", ClinicalTheme::text_secondary()),
                    Span::styled(format!("{:.0}", b.pediatric), ClinicalTheme::text()),
                    Span::styled("  Dialysis years ", ClinicalTheme::text_secondary()),
                    Span::styled(format!("{:.0}", b.dialysis_years), ClinicalTheme::text()),
                    Span::styled("  PRA bonus ", ClinicalTheme::text_secondary()),
                    Span::styled(format!("{:.2}", b.pra_bonus), ClinicalTheme::text()),
                ])]
            }
            None => vec![Line::from(Span::styled(
                "No recipients registered.",
                ClinicalTheme::text_muted(),
            ))],
        };
        if !ranking.rejected.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(
                    "{} recipient rows skipped as invalid (see log)",
                    ranking.rejected.len()
                ),
                ClinicalTheme::warning(),
            )));
        }

        let block = Block::default()
            .title(Span::styled(" Score Breakdown ", ClinicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border());
        f.render_widget(Paragraph::new(lines).block(block), chunks[2]);
    }

    render_notice(
        f,
        chunks[3],
        state.notice.as_deref(),
        &[("[↑↓] ", "Select "), ("[R] ", "Refresh "), ("[E] ", "Export JSON "), ("[Esc] ", "Back")],
    );
}
