//! UI module: View components for the TUI.

pub mod compatibility;
pub mod donor_form;
pub mod form;
pub mod home;
pub mod manage;
pub mod recipient_form;
pub mod results;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, TableState, Wrap},
    Frame,
};

use crate::tui::styles::ClinicalTheme;

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![Line::from(vec![Span::styled(
        "Decision support only. Allocation decisions require crossmatch and clinical review.",
        ClinicalTheme::text_muted(),
    )])];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(ClinicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}

fn render_title(f: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled(title.to_string(), ClinicalTheme::title()),
        Span::styled(format!(" │ {subtitle}"), ClinicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

/// Footer showing a one-off notice if present, key hints otherwise.
fn render_notice(f: &mut Frame, area: Rect, notice: Option<&str>, hints: &[(&str, &str)]) {
    let content = match notice {
        Some(message) => Line::from(Span::styled(message.to_string(), ClinicalTheme::info())),
        None => Line::from(
            hints
                .iter()
                .flat_map(|(key, desc)| {
                    [
                        Span::styled(key.to_string(), ClinicalTheme::key_hint()),
                        Span::styled(desc.to_string(), ClinicalTheme::key_desc()),
                    ]
                })
                .collect::<Vec<_>>(),
        ),
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}

/// Move a table selection by one row, wrapping at both ends.
fn step_selection(table: &mut TableState, len: usize, forward: bool) {
    if len == 0 {
        table.select(None);
        return;
    }
    let next = match table.selected() {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    };
    table.select(Some(next));
}

fn id_label(id: Option<i64>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}
