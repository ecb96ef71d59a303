// src/main.rs

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

mod app;
mod config;
mod core;
mod logging;
mod ui;

use crate::app::{App, AppState};
use crate::config::ScanConfig;
use crate::core::models::{SessionReport, Target};
use crate::core::scanner::{ProbeContext, run_session};

type SessionOutcome = std::result::Result<SessionReport, String>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let config = Arc::new(ScanConfig::load()?);
    info!(?config, "Configuration loaded.");
    let ctx = ProbeContext::new(config)?;

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let result = run(&mut terminal, ctx).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

async fn run<B: Backend>(terminal: &mut Terminal<B>, ctx: ProbeContext) -> Result<()> {
    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<SessionOutcome>(1);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app, &tx, &ctx)?;
        }
        app.on_tick();

        if let Ok(outcome) = rx.try_recv() {
            app.finish_scan(outcome);
        }
    }
    Ok(())
}

fn handle_events(app: &mut App, tx: &mpsc::Sender<SessionOutcome>, ctx: &ProbeContext) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.state {
                AppState::Disclaimer => match key.code {
                    KeyCode::Enter => app.state = AppState::Idle,
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                },
                AppState::Idle => handle_idle_input(app, key.code, tx, ctx),
                AppState::Finished => handle_finished_input(app, key.code),
                AppState::Scanning => {
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                        app.quit();
                    }
                }
            }
        }
    }
    Ok(())
}

/// Typing, session selection and scan start. Esc quits, since `q` is a valid domain character.
fn handle_idle_input(app: &mut App, key_code: KeyCode, tx: &mpsc::Sender<SessionOutcome>, ctx: &ProbeContext) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Up => app.select_previous_session(),
        KeyCode::Down => app.select_next_session(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                return;
            }
            let target = match Target::parse(&app.input) {
                Ok(target) => target,
                Err(e) => {
                    app.scan_error = Some(e.to_string());
                    return;
                }
            };

            app.start_scan();
            let kind = app.selected_session();
            let tx = tx.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let outcome = run_session(target, kind, ctx).await.map_err(|e| e.to_string());
                let _ = tx.send(outcome).await;
            });
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.reset(),
        KeyCode::Char('e') | KeyCode::Char('E') => app.export(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        _ => {}
    }
}
