// src/ui/widgets/input.rs
use ratatui::{prelude::*, widgets::{Block, Borders, Paragraph}};
use crate::app::{App, AppState};

/// Renders the input box widget. A rejected target is shown in the title.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let input_block = match &app.scan_error {
        Some(error) => Block::default()
            .borders(Borders::ALL)
            .title(format!("Target Domain ({})", error))
            .border_style(Style::default().fg(Color::Red)),
        None => Block::default().borders(Borders::ALL).title("Target Domain"),
    };
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    if app.state == AppState::Idle {
        let width = u16::try_from(app.input.chars().count()).unwrap_or(u16::MAX);
        frame.set_cursor_position(Position::new(area.x.saturating_add(width).saturating_add(1), area.y + 1));
    }
}
