// src/core/scanner/waf_scanner.rs

use crate::core::deadline::with_timeout;
use crate::core::error::ProbeError;
use crate::core::models::{ProbeResult, Target};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

static RE_ANSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap());

/// Delegates detection to the external fingerprinting tool and reads its verdict.
///
/// The child is killed if the deadline passes.
pub async fn run_waf_scan(command: &str, target: &Target, limit: Duration) -> ProbeResult {
    info!(target = %target, command, "Running WAF detection.");
    let output = with_timeout(limit, async {
        Command::new(command)
            .arg(target.as_str())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ProbeError::External(format!("{} is not installed or not on PATH", command)),
                _ => ProbeError::External(format!("could not run {}: {}", command, e)),
            })
    })
    .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::External(format!("{} exited with {}: {}", command, output.status, stderr.trim())));
    }
    interpret_output(&String::from_utf8_lossy(&output.stdout))
}

/// `None` when the tool says there is no WAF, the "is behind" line when it names one.
pub fn interpret_output(raw: &str) -> ProbeResult {
    let text = RE_ANSI.replace_all(raw, "");
    if text.trim().is_empty() {
        return Err(ProbeError::Malformed("WAF tool produced no output".to_string()));
    }
    if text.contains("No WAF detected") {
        return Ok(None);
    }

    let brand = text
        .lines()
        .map(str::trim)
        .find(|line| line.contains("is behind"))
        .map(|line| line.trim_start_matches(|c: char| !c.is_alphanumeric()).to_string());
    debug!(brand = ?brand, "WAF tool verdict.");
    Ok(Some(brand.unwrap_or_else(|| "WAF detected, but brand not identified".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_waf_is_a_negative() {
        let out = "[*] Checking https://example.com\n[+] Generic Detection results:\n[-] No WAF detected by the generic detection\n";
        assert!(matches!(interpret_output(out), Ok(None)));
    }

    #[test]
    fn names_the_detected_brand_without_colors() {
        let out = "[*] Checking https://example.com\n\x1b[1;92m[+]\x1b[0m The site \x1b[1;94mhttps://example.com\x1b[0m is behind \x1b[1;96mCloudflare (Cloudflare Inc.)\x1b[0m WAF.\n";
        let verdict = interpret_output(out).unwrap().unwrap();
        assert_eq!(verdict, "The site https://example.com is behind Cloudflare (Cloudflare Inc.) WAF.");
    }

    #[test]
    fn unnamed_waf_is_still_a_finding() {
        let out = "[+] Generic Detection results:\n[*] The site seems to be behind a WAF or some sort of security solution\n";
        assert_eq!(interpret_output(out).unwrap().as_deref(), Some("WAF detected, but brand not identified"));
    }

    #[tokio::test]
    async fn missing_tool_is_a_failure() {
        let target = Target::parse("example.com").unwrap();
        let result = run_waf_scan("dominfo-no-such-waf-tool", &target, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ProbeError::External(msg)) if msg.contains("not installed")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_is_a_failure() {
        let target = Target::parse("example.com").unwrap();
        let result = run_waf_scan("false", &target, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ProbeError::External(msg)) if msg.contains("exited")));
    }
}
