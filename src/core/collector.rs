// src/core/collector.rs

use crate::core::models::{Category, CategoryReport, ProbeOutcome};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drains an outcome stream into a category report.
///
/// Returns when the stream closes, i.e. when every producer is done. Failures
/// are recorded and logged; they never end collection early.
pub async fn collect(category: Category, mut outcomes: mpsc::UnboundedReceiver<ProbeOutcome>) -> CategoryReport {
    let mut report = CategoryReport::new(category);

    while let Some(outcome) = outcomes.recv().await {
        match &outcome {
            ProbeOutcome::Finding { .. } => debug!(task = %outcome.task_id(), "Finding received."),
            ProbeOutcome::Clear { .. } => {}
            ProbeOutcome::Failure { task_id, reason } => warn!(task = %task_id, reason, "Probe failed."),
        }
        report.record(outcome);
    }

    info!(
        category = %category,
        findings = report.findings.len(),
        failures = report.failures.len(),
        clear = report.clear,
        resolved = report.resolved(),
        "Category collected."
    );
    report
}
