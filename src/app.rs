// src/app.rs

use crate::core::models::{SessionKind, SessionReport, Verdict};
use crate::logging::get_data_dir;
use color_eyre::eyre::{Result, WrapErr};
use ratatui::widgets::ScrollbarState;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{error, info};

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Disclaimer,
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub findings: usize,
    pub failures: usize,
    pub categories_found: usize,
    pub categories_clean: usize,
    pub categories_failed: usize,
}

impl ScanSummary {
    pub fn from_report(report: &SessionReport) -> Self {
        let mut summary = Self {
            findings: report.finding_count(),
            failures: report.failures().count(),
            ..Self::default()
        };
        for category in &report.categories {
            match category.verdict() {
                Verdict::Found => summary.categories_found += 1,
                Verdict::NoneFound => summary.categories_clean += 1,
                Verdict::Failed => summary.categories_failed += 1,
            }
        }
        summary
    }
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub sessions: Vec<SessionKind>,
    pub selected_session: usize,
    pub report: Option<SessionReport>,
    /// Set when a session could not start or was rejected as a whole.
    pub scan_error: Option<String>,
    pub summary: ScanSummary,
    pub scroll_offset: usize,
    /// Rendered report lines, updated on every draw.
    pub report_length: usize,
    pub report_scroll_state: ScrollbarState,
    pub export_status: ExportStatus,
    pub spinner_frame: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            state: AppState::Disclaimer,
            input: String::new(),
            sessions: SessionKind::iter().collect(),
            selected_session: 0,
            report: None,
            scan_error: None,
            summary: ScanSummary::default(),
            scroll_offset: 0,
            report_length: 0,
            report_scroll_state: ScrollbarState::default(),
            export_status: ExportStatus::Idle,
            spinner_frame: 0,
        }
    }

    pub fn selected_session(&self) -> SessionKind {
        self.sessions.get(self.selected_session).copied().unwrap_or(SessionKind::Basic)
    }

    pub fn select_next_session(&mut self) {
        self.selected_session = (self.selected_session + 1) % self.sessions.len();
    }

    pub fn select_previous_session(&mut self) {
        self.selected_session = self.selected_session.checked_sub(1).unwrap_or(self.sessions.len() - 1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
        self.report_scroll_state = self.report_scroll_state.position(self.scroll_offset);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + 1).min(self.report_length.saturating_sub(1));
        self.report_scroll_state = self.report_scroll_state.position(self.scroll_offset);
    }

    /// Records how many lines the report has and keeps the offset inside them.
    pub fn set_report_length(&mut self, length: usize) {
        self.report_length = length;
        self.scroll_offset = self.scroll_offset.min(length.saturating_sub(1));
        self.report_scroll_state = self.report_scroll_state.content_length(length).position(self.scroll_offset);
    }

    pub fn start_scan(&mut self) {
        self.state = AppState::Scanning;
        self.scan_error = None;
        self.spinner_frame = 0;
    }

    /// Stores the session outcome. A session-level error sends the user back to the input.
    pub fn finish_scan(&mut self, outcome: std::result::Result<SessionReport, String>) {
        match outcome {
            Ok(report) => {
                self.summary = ScanSummary::from_report(&report);
                self.report = Some(report);
                self.state = AppState::Finished;
            }
            Err(e) => {
                self.scan_error = Some(e);
                self.state = AppState::Idle;
            }
        }
    }

    pub fn export(&mut self) {
        let Some(report) = &self.report else { return };
        self.export_status = match export_report(report, &get_data_dir()) {
            Ok(path) => {
                info!(path = %path.display(), "Report exported.");
                ExportStatus::Success(path.display().to_string())
            }
            Err(e) => {
                error!(error = %e, "Report export failed.");
                ExportStatus::Error(e.to_string())
            }
        };
    }

    pub fn on_tick(&mut self) {
        if self.state == AppState::Scanning {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Back to the input, keeping the chosen session.
    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.report = None;
        self.scan_error = None;
        self.summary = ScanSummary::default();
        self.scroll_offset = 0;
        self.report_length = 0;
        self.report_scroll_state = ScrollbarState::default();
        self.export_status = ExportStatus::Idle;
    }
}

/// Writes the report as pretty JSON to `<dir>/<target>-<timestamp>.json`.
pub fn export_report(report: &SessionReport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).wrap_err_with(|| format!("creating {}", dir.display()))?;
    let stamp = report.finished_at.unwrap_or(report.started_at).format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("{}-{}.json", report.target, stamp));
    let json = serde_json::to_string_pretty(report).wrap_err("serializing report")?;
    std::fs::write(&path, json).wrap_err_with(|| format!("writing {}", path.display()))?;
    Ok(path)
}
