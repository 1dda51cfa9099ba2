//! Home view: registry overview and navigation.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::domain::BlankLocusPolicy;
use crate::tui::styles::{ClinicalTheme, APP_NAME};

/// Home state for rendering.
#[derive(Debug, Clone, Default)]
pub struct HomeState {
    pub donor_count: usize,
    pub recipient_count: usize,
    pub database: String,
    pub blank_locus_policy: BlankLocusPolicy,
    pub error: Option<String>,
}

/// Render the home view.
pub fn render_home(f: &mut Frame, area: Rect, state: &HomeState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .margin(1)
        .split(chunks[1]);

    render_status(f, columns[0], state);
    render_menu(f, columns[1]);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled(APP_NAME, ClinicalTheme::title()),
        Span::styled(" │ ", ClinicalTheme::text_muted()),
        Span::styled(
            "Kidney Transplant Donor/Recipient Matching",
            ClinicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_status(f: &mut Frame, area: Rect, state: &HomeState) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Recipients: ", ClinicalTheme::text_secondary()),
            Span::styled(state.recipient_count.to_string(), ClinicalTheme::text()),
        ]),
        Line::from(vec![
            Span::styled("  Donors:     ", ClinicalTheme::text_secondary()),
            Span::styled(state.donor_count.to_string(), ClinicalTheme::text()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Database:   ", ClinicalTheme::text_secondary()),
            Span::styled(state.database.clone(), ClinicalTheme::text_muted()),
        ]),
        Line::from(vec![
            Span::styled("  Blank HLA:  ", ClinicalTheme::text_secondary()),
            Span::styled(state.blank_locus_policy.to_string(), ClinicalTheme::text_muted()),
        ]),
    ];

    if let Some(err) = &state.error {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  ! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ]));
    }

    let block = Block::default()
        .title(Span::styled(" Registry ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_menu(f: &mut Frame, area: Rect) {
    let entries = [
        ("[R] ", "Add Recipient"),
        ("[D] ", "Add Donor"),
        ("[C] ", "Compatibility Check"),
        ("[V] ", "View Results"),
        ("[M] ", "Manage Data"),
        ("[Q] ", "Quit"),
    ];

    let lines: Vec<Line> = entries
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!("  {key}"), ClinicalTheme::key_hint()),
                Span::styled(*desc, ClinicalTheme::key_desc()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Menu ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}
