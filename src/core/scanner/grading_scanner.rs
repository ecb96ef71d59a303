// src/core/scanner/grading_scanner.rs

use crate::core::deadline::{PollState, poll_until};
use crate::core::error::ProbeError;
use crate::core::models::{ProbeResult, Target};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// The subset of the grading service's `analyze` response we use.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingReport {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub protocol: String,
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<GradingEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingEndpoint {
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub grade: Option<String>,
}

/// Starts (or resumes) a remote assessment and polls it until it is ready.
///
/// The remote job runs for minutes; it is polled every `every` until
/// `deadline`, and the first attempt is made straight away.
pub async fn run_grading_scan(
    client: &reqwest::Client,
    endpoint: &str,
    target: &Target,
    every: Duration,
    deadline: Duration,
) -> ProbeResult {
    let url = Url::parse_with_params(endpoint, &[("host", target.as_str())])
        .map_err(|e| ProbeError::Other(format!("bad grading endpoint {}: {}", endpoint, e)))?;
    info!(target = %target, "Requesting TLS grading.");

    let report = poll_until(every, deadline, || {
        let url = url.clone();
        async move {
            let body = client.get(url).send().await?.error_for_status()?.text().await?;
            interpret(&body)
        }
    })
    .await?;

    Ok(Some(format_report(&report)))
}

/// Maps one response body onto the poll state. `ERROR` ends polling with a failure.
pub fn interpret(body: &str) -> Result<PollState<GradingReport>, ProbeError> {
    let report: GradingReport = serde_json::from_str(body).map_err(|e| ProbeError::Malformed(e.to_string()))?;
    debug!(status = %report.status, "Grading status.");
    match report.status.as_str() {
        "READY" => Ok(PollState::Ready(report)),
        "ERROR" => Err(ProbeError::External(
            report.status_message.unwrap_or_else(|| "grading service reported an error".to_string()),
        )),
        _ => Ok(PollState::Pending),
    }
}

pub fn format_report(report: &GradingReport) -> String {
    let mut out = String::new();
    let grade = report.endpoints.iter().find_map(|e| e.grade.as_deref()).unwrap_or("-");
    let _ = writeln!(out, "Host: {}", report.host);
    let _ = writeln!(out, "Port: {}", report.port);
    let _ = writeln!(out, "Protocol: {}", report.protocol);
    let _ = write!(out, "Grade: {}", grade);

    for endpoint in &report.endpoints {
        let _ = write!(
            out,
            "\nEndpoint {} ({}): {} [{}]",
            endpoint.ip_address,
            endpoint.server_name.as_deref().unwrap_or("-"),
            endpoint.grade.as_deref().unwrap_or("-"),
            endpoint.status_message
        );
    }
    out
}
