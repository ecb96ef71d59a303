// src/ui/layout.rs

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// The areas of the main screen, computed once per frame.
pub struct AppLayout {
    pub input: Rect,
    pub report: Rect,
    pub menu: Rect,
    pub summary: Rect,
    pub footer: Rect,
}

/// Input on top, footer at the bottom; in between the report on the left and
/// the session menu above the summary on the right.
pub fn create_layout(frame_size: Rect, menu_height: u16) -> AppLayout {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame_size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(main_chunks[1]);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(menu_height + 2), Constraint::Min(0)])
        .split(content_chunks[1]);

    AppLayout {
        input: main_chunks[0],
        report: content_chunks[0],
        menu: side_chunks[0],
        summary: side_chunks[1],
        footer: main_chunks[2],
    }
}
