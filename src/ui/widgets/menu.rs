// src/ui/widgets/menu.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState},
};

/// The session picker. Only interactive while the user is typing a target.
pub fn render_menu(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .sessions
        .iter()
        .enumerate()
        .map(|(i, kind)| ListItem::new(format!("{}. {}", i + 1, kind)))
        .collect();

    let highlight = if app.state == AppState::Idle {
        Style::new().bg(Color::DarkGray).fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::new().add_modifier(Modifier::BOLD)
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Session (↑ ↓)"))
        .highlight_symbol("> ")
        .highlight_style(highlight);

    let mut state = ListState::default().with_selected(Some(app.selected_session));
    frame.render_stateful_widget(list, area, &mut state);
}
