// src/ui/widgets/report_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use crate::core::models::{CategoryReport, SessionReport, Verdict};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, Wrap},
};

pub fn render_report_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Scan Report (Navigate with ↑ ↓)");

    let report = match (&app.state, &app.report) {
        (AppState::Finished, Some(report)) => report,
        _ => {
            let content = match app.state {
                AppState::Scanning => {
                    let spinner_char = SPINNER_CHARS[app.spinner_frame % SPINNER_CHARS.len()];
                    Paragraph::new(Line::from(vec![
                        Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
                        Span::raw(format!("Running {}... Please wait.", app.selected_session())),
                    ]))
                }
                _ => Paragraph::new("Scan results will appear here..."),
            };
            frame.render_widget(content.alignment(Alignment::Center).block(main_block), area);
            return;
        }
    };

    let lines = report_lines(report);
    app.set_report_length(lines.len());

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(app.scroll_offset).unwrap_or(u16::MAX), 0));
    frame.render_widget(paragraph, inner_area);

    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        inner_area,
        &mut app.report_scroll_state,
    );
}

/// Findings per category and entity, an explicit line for every empty
/// category, and the failure diagnostics at the very end.
pub fn report_lines(report: &SessionReport) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Target: "),
            Span::styled(report.target.to_string(), Style::default().fg(Color::Yellow).bold()),
            Span::raw(format!("  ({})", report.kind)),
        ]),
        Line::from(""),
    ];

    for category in &report.categories {
        lines.push(Line::from(category.category.title().yellow().bold()));
        match category.verdict() {
            Verdict::Found => {
                for (entity, findings) in category.grouped() {
                    let nested = findings.iter().any(|f| f.task_id.entity.is_some());
                    if nested {
                        lines.push(Line::from(Span::styled(format!("  {}", entity), Style::default().fg(Color::Cyan))));
                    }
                    let indent = if nested { "    " } else { "  " };
                    for finding in findings {
                        for text in finding.text.lines() {
                            lines.push(Line::from(format!("{}{}", indent, text)));
                        }
                    }
                }
            }
            Verdict::NoneFound => {
                let color = if category.failures.is_empty() { Color::Green } else { Color::Yellow };
                lines.push(Line::from(Span::styled(negative_line(category), Style::default().fg(color))));
            }
            Verdict::Failed => {
                lines.push(Line::from(Span::styled(
                    "  Could not complete, see diagnostics below.",
                    Style::default().fg(Color::Red),
                )));
            }
        }
        lines.push(Line::from(""));
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        lines.push(Line::from("Diagnostics".red().bold()));
        for failure in failures {
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", failure.task_id), Style::default().fg(Color::DarkGray)),
                Span::raw(failure.reason.clone()),
            ]));
        }
    }
    lines
}

/// The "nothing found" line, qualified when some checks of the category could not complete.
fn negative_line(category: &CategoryReport) -> String {
    let message = category.category.negative_message();
    match category.failures.len() {
        0 => format!("  {}", message),
        failed => format!(
            "  {} ({} of {} checks failed, see diagnostics below.)",
            message,
            failed,
            category.resolved()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Category, ProbeOutcome, SessionKind, Target, TaskId};

    fn plain(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect()).collect()
    }

    #[test]
    fn negatives_are_explicit_and_diagnostics_come_last() {
        let mut report = SessionReport::start(Target::parse("example.com").unwrap(), SessionKind::Full);

        let mut blacklist = CategoryReport::new(Category::Blacklist);
        blacklist.record(ProbeOutcome::Clear { task_id: TaskId::new(Category::Blacklist, "zen.spamhaus.org") });
        blacklist.record(ProbeOutcome::Failure {
            task_id: TaskId::new(Category::Blacklist, "bl.example").with_entity("192.0.2.1"),
            reason: "DNS error: timeout".into(),
        });
        report.add(blacklist);

        let mut ports = CategoryReport::new(Category::Ports);
        ports.record(ProbeOutcome::Finding { task_id: TaskId::new(Category::Ports, "80"), text: "80 (HTTP)".into() });
        report.add(ports);

        let text = plain(&report_lines(&report.finish()));
        let ports_at = text.iter().position(|l| l == "Open Ports").unwrap();
        assert_eq!(text[ports_at + 1], "  80 (HTTP)");
        assert!(text.contains(
            &"  No IP addresses are listed in any known blacklists. (1 of 2 checks failed, see diagnostics below.)"
                .to_string()
        ));

        let diagnostics_at = text.iter().position(|l| l == "Diagnostics").unwrap();
        assert!(diagnostics_at > ports_at);
        assert_eq!(text.last().unwrap(), "  blacklist:bl.example/192.0.2.1 DNS error: timeout");
    }

    #[test]
    fn mostly_failed_category_does_not_read_as_clean() {
        let mut blacklist = CategoryReport::new(Category::Blacklist);
        blacklist.record(ProbeOutcome::Clear { task_id: TaskId::new(Category::Blacklist, "zen.spamhaus.org") });
        for i in 0..60 {
            blacklist.record(ProbeOutcome::Failure {
                task_id: TaskId::new(Category::Blacklist, format!("zone{i}.example")),
                reason: "DNS error: servfail".into(),
            });
        }
        assert_eq!(blacklist.verdict(), Verdict::NoneFound);
        assert_eq!(
            negative_line(&blacklist),
            "  No IP addresses are listed in any known blacklists. (60 of 61 checks failed, see diagnostics below.)"
        );

        let mut ports = CategoryReport::new(Category::Ports);
        ports.record(ProbeOutcome::Clear { task_id: TaskId::new(Category::Ports, "22") });
        assert_eq!(negative_line(&ports), "  No open ports found.");
    }
}
