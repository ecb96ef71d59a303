// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
    text::Line,
};

/// Renders the summary widget: overall counts and how each category ended.
///
/// Nothing is shown until a session has finished.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Target
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Totals
            Constraint::Length(1), // Spacer
            Constraint::Length(4), // Categories
            Constraint::Min(0),    // Export status
        ])
        .split(area);

    if app.state != AppState::Finished {
        return;
    }
    let Some(report) = &app.report else { return };

    let elapsed = report
        .finished_at
        .map(|end| (end - report.started_at).num_seconds())
        .unwrap_or_default();
    let target_text = Text::from(vec![
        Line::from(report.target.to_string().bold()),
        Line::from(format!("finished in {}s", elapsed)).style(Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(target_text).alignment(Alignment::Center), summary_chunks[0]);

    let totals = Text::from(vec![
        Line::from("TOTALS".bold()),
        Line::from(vec![Span::raw("Findings: "), Span::styled(app.summary.findings.to_string(), Style::default().fg(Color::Cyan))]),
        Line::from(vec![Span::raw("Failures: "), Span::styled(app.summary.failures.to_string(), Style::default().fg(Color::Red))]),
    ]);
    frame.render_widget(Paragraph::new(totals), summary_chunks[2]);

    let categories = Text::from(vec![
        Line::from("CATEGORIES".bold()),
        Line::from(vec![Span::styled("● ", Style::default().fg(Color::Cyan)), Span::raw(format!("{} with findings", app.summary.categories_found))]),
        Line::from(vec![Span::styled("✓ ", Style::default().fg(Color::Green)), Span::raw(format!("{} clean", app.summary.categories_clean))]),
        Line::from(vec![Span::styled("✗ ", Style::default().fg(Color::Red)), Span::raw(format!("{} failed", app.summary.categories_failed))]),
    ]);
    frame.render_widget(Paragraph::new(categories), summary_chunks[4]);

    let export = match &app.export_status {
        crate::app::ExportStatus::Idle => Line::from(""),
        crate::app::ExportStatus::Success(path) => Line::from(format!("Exported to {}", path)).style(Style::default().fg(Color::Green)),
        crate::app::ExportStatus::Error(e) => Line::from(format!("Export failed: {}", e)).style(Style::default().fg(Color::Red)),
    };
    frame.render_widget(Paragraph::new(export).wrap(ratatui::widgets::Wrap { trim: true }), summary_chunks[5]);
}
