// src/core/models.rs

use crate::core::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator};
use url::Url;

// --- Reusable Result Types ---

/// What a probe's unit of work yields: a finding, nothing to report, or a failure.
pub type ProbeResult = Result<Option<String>, ProbeError>;

// --- Target ---

/// The domain under inspection. Immutable for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target(String);

impl Target {
    /// Accepts a bare host (`example.com`) or a URL and keeps only the host part.
    pub fn parse(input: &str) -> Result<Self, ProbeError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ProbeError::InvalidTarget("empty input".to_string()));
        }

        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };

        let host = Url::parse(&with_scheme)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.trim_end_matches('.').to_lowercase()))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProbeError::InvalidTarget(raw.to_string()))?;

        Ok(Self(host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Categories and Sessions ---

/// One kind of probe. Every category runs its own dispatcher with its own budget.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[strum(to_string = "whois")]
    Whois,
    #[strum(to_string = "dns")]
    DnsRecords,
    #[strum(to_string = "tls")]
    TlsCertificate,
    #[strum(to_string = "grading")]
    TlsGrading,
    #[strum(to_string = "axfr")]
    ZoneTransfer,
    #[strum(to_string = "dnssec")]
    Dnssec,
    #[strum(to_string = "port")]
    Ports,
    #[strum(to_string = "headers")]
    SecurityHeaders,
    #[strum(to_string = "subdomain")]
    Subdomains,
    #[strum(to_string = "waf")]
    Waf,
    #[strum(to_string = "blacklist")]
    Blacklist,
    #[strum(to_string = "tech")]
    ServerTech,
}

impl Category {
    /// Section heading used by the presentation layer.
    pub fn title(self) -> &'static str {
        match self {
            Category::Whois => "WHOIS Information",
            Category::DnsRecords => "DNS Records",
            Category::TlsCertificate => "SSL/TLS Certificate",
            Category::TlsGrading => "SSL/TLS Grading",
            Category::ZoneTransfer => "DNS Zone Transfer",
            Category::Dnssec => "DNSSEC Support",
            Category::Ports => "Open Ports",
            Category::SecurityHeaders => "Security Headers",
            Category::Subdomains => "Subdomains",
            Category::Waf => "WAF Detection",
            Category::Blacklist => "Blacklist Check",
            Category::ServerTech => "Server Technologies",
        }
    }

    /// The explicit "ran and found nothing" line shown instead of silence.
    pub fn negative_message(self) -> &'static str {
        match self {
            Category::Whois => "No relevant whois information found.",
            Category::DnsRecords => "No DNS records found.",
            Category::TlsCertificate => "Server did not present a certificate.",
            Category::TlsGrading => "No grading result available.",
            Category::ZoneTransfer => "DNS zone transfer is not enabled.",
            Category::Dnssec => "DNSSEC is not enabled.",
            Category::Ports => "No open ports found.",
            Category::SecurityHeaders => "No security headers could be evaluated.",
            Category::Subdomains => "No live subdomains found.",
            Category::Waf => "No WAF detected.",
            Category::Blacklist => "No IP addresses are listed in any known blacklists.",
            Category::ServerTech => "No specific technologies detected.",
        }
    }
}

/// The eight operations a user can start. Each maps to a fixed set of categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    #[strum(to_string = "Basic Scan (WHOIS, DNS, SSL, grading, AXFR, DNSSEC)")]
    Basic,
    #[strum(to_string = "Multi Port Scanner")]
    Ports,
    #[strum(to_string = "Security Headers Detection")]
    SecurityHeaders,
    #[strum(to_string = "Subdomain Scanner")]
    Subdomains,
    #[strum(to_string = "WAF Detection")]
    Waf,
    #[strum(to_string = "Blacklist Check")]
    Blacklist,
    #[strum(to_string = "Detect Server Technologies")]
    ServerTech,
    #[strum(to_string = "Full Scan (may take a while)")]
    Full,
}

impl SessionKind {
    pub fn categories(self) -> Vec<Category> {
        match self {
            SessionKind::Basic => vec![
                Category::Whois,
                Category::DnsRecords,
                Category::TlsCertificate,
                Category::TlsGrading,
                Category::ZoneTransfer,
                Category::Dnssec,
            ],
            SessionKind::Ports => vec![Category::Ports],
            SessionKind::SecurityHeaders => vec![Category::SecurityHeaders],
            SessionKind::Subdomains => vec![Category::Subdomains],
            SessionKind::Waf => vec![Category::Waf],
            SessionKind::Blacklist => vec![Category::Blacklist],
            SessionKind::ServerTech => vec![Category::ServerTech],
            SessionKind::Full => Category::iter().collect(),
        }
    }
}

// --- Probe Identity and Outcome ---

/// Identifies one probe task, e.g. `port:443` or `blacklist:zen.spamhaus.org/93.184.216.34`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub category: Category,
    pub subject: String,
    /// The entity results are grouped under for display (an IP for blacklist checks).
    pub entity: Option<String>,
}

impl TaskId {
    pub fn new(category: Category, subject: impl Into<String>) -> Self {
        Self { category, subject: subject.into(), entity: None }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn group_key(&self) -> &str {
        self.entity.as_deref().unwrap_or(&self.subject)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.subject)?;
        if let Some(entity) = &self.entity {
            write!(f, "/{}", entity)?;
        }
        Ok(())
    }
}

/// Exactly one of these is produced for every dispatched task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Finding { task_id: TaskId, text: String },
    /// The probe ran and had nothing to report.
    Clear { task_id: TaskId },
    Failure { task_id: TaskId, reason: String },
}

impl ProbeOutcome {
    pub fn from_result(task_id: TaskId, result: ProbeResult) -> Self {
        match result {
            Ok(Some(text)) => ProbeOutcome::Finding { task_id, text },
            Ok(None) => ProbeOutcome::Clear { task_id },
            Err(e) => ProbeOutcome::Failure { task_id, reason: e.to_string() },
        }
    }

    pub fn task_id(&self) -> &TaskId {
        match self {
            ProbeOutcome::Finding { task_id, .. }
            | ProbeOutcome::Clear { task_id }
            | ProbeOutcome::Failure { task_id, .. } => task_id,
        }
    }
}

// --- Reports ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub task_id: TaskId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub task_id: TaskId,
    pub reason: String,
}

/// How a category ended, as far as the presentation layer is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Found,
    NoneFound,
    Failed,
}

/// Everything one category contributed to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: Category,
    pub findings: Vec<Finding>,
    pub failures: Vec<Failure>,
    /// Tasks that ran and had nothing to report.
    pub clear: usize,
    /// Set when a precondition of the whole category failed and no task ran.
    pub aborted: bool,
}

impl CategoryReport {
    pub fn new(category: Category) -> Self {
        Self { category, findings: Vec::new(), failures: Vec::new(), clear: 0, aborted: false }
    }

    /// A report for a category whose precondition failed: one failure, nothing else.
    pub fn aborted(category: Category, subject: &str, reason: impl Into<String>) -> Self {
        let mut report = Self::new(category);
        report.failures.push(Failure { task_id: TaskId::new(category, subject), reason: reason.into() });
        report.aborted = true;
        report
    }

    pub fn record(&mut self, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::Finding { task_id, text } => self.findings.push(Finding { task_id, text }),
            ProbeOutcome::Clear { .. } => self.clear += 1,
            ProbeOutcome::Failure { task_id, reason } => self.failures.push(Failure { task_id, reason }),
        }
    }

    /// Number of outcomes recorded so far.
    pub fn resolved(&self) -> usize {
        self.findings.len() + self.failures.len() + self.clear
    }

    pub fn verdict(&self) -> Verdict {
        if !self.findings.is_empty() {
            Verdict::Found
        } else if self.aborted || (self.clear == 0 && !self.failures.is_empty()) {
            Verdict::Failed
        } else {
            Verdict::NoneFound
        }
    }

    /// Findings grouped by entity (IP, subdomain, port), with stable ordering inside each group.
    pub fn grouped(&self) -> BTreeMap<&str, Vec<&Finding>> {
        let mut groups: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            groups.entry(finding.task_id.group_key()).or_default().push(finding);
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.task_id.cmp(&b.task_id).then_with(|| a.text.cmp(&b.text)));
        }
        groups
    }
}

/// The frozen result of one session against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub target: Target,
    pub kind: SessionKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub categories: Vec<CategoryReport>,
}

impl SessionReport {
    pub fn start(target: Target, kind: SessionKind) -> Self {
        Self { target, kind, started_at: Utc::now(), finished_at: None, categories: Vec::new() }
    }

    pub fn add(&mut self, report: CategoryReport) {
        self.categories.push(report);
    }

    /// Stamps the finish time and puts categories in their canonical order.
    pub fn finish(mut self) -> Self {
        self.categories.sort_by_key(|c| c.category);
        self.finished_at = Some(Utc::now());
        self
    }

    #[cfg(test)]
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn finding_count(&self) -> usize {
        self.categories.iter().map(|c| c.findings.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.categories.iter().flat_map(|c| c.failures.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parse_strips_scheme_path_and_port() {
        let target = Target::parse("https://Example.COM:8443/login?x=1").unwrap();
        assert_eq!(target.as_str(), "example.com");
        assert_eq!(Target::parse("  www.example.org ").unwrap().as_str(), "www.example.org");
        assert!(Target::parse("   ").is_err());
    }

    #[test]
    fn task_id_display_includes_entity() {
        let id = TaskId::new(Category::Blacklist, "zen.spamhaus.org").with_entity("93.184.216.34");
        assert_eq!(id.to_string(), "blacklist:zen.spamhaus.org/93.184.216.34");
        assert_eq!(TaskId::new(Category::Ports, "443").to_string(), "port:443");
    }

    #[test]
    fn verdict_distinguishes_nothing_found_from_failed() {
        let mut clean = CategoryReport::new(Category::Blacklist);
        clean.record(ProbeOutcome::Clear { task_id: TaskId::new(Category::Blacklist, "a") });
        clean.record(ProbeOutcome::Failure {
            task_id: TaskId::new(Category::Blacklist, "b"),
            reason: "servfail".into(),
        });
        assert_eq!(clean.verdict(), Verdict::NoneFound);

        let mut broken = CategoryReport::new(Category::Waf);
        broken.record(ProbeOutcome::Failure { task_id: TaskId::new(Category::Waf, "x"), reason: "no tool".into() });
        assert_eq!(broken.verdict(), Verdict::Failed);

        assert_eq!(CategoryReport::new(Category::Subdomains).verdict(), Verdict::NoneFound);
        assert_eq!(
            CategoryReport::aborted(Category::Blacklist, "example.com", "cannot resolve").verdict(),
            Verdict::Failed
        );
    }

    #[test]
    fn grouped_collects_findings_per_entity() {
        let mut report = CategoryReport::new(Category::Blacklist);
        for (zone, ip) in [("b.zone", "10.0.0.1"), ("a.zone", "10.0.0.1"), ("a.zone", "10.0.0.2")] {
            report.record(ProbeOutcome::Finding {
                task_id: TaskId::new(Category::Blacklist, zone).with_entity(ip),
                text: format!("{ip} {zone}"),
            });
        }
        let groups = report.grouped();
        assert_eq!(groups.len(), 2);
        let first: Vec<&str> = groups["10.0.0.1"].iter().map(|f| f.task_id.subject.as_str()).collect();
        assert_eq!(first, vec!["a.zone", "b.zone"]);
    }

    #[test]
    fn full_session_covers_every_category() {
        let full = SessionKind::Full.categories();
        assert_eq!(full.len(), Category::iter().count());
        for kind in SessionKind::iter().filter(|k| *k != SessionKind::Full) {
            for category in kind.categories() {
                assert!(full.contains(&category));
            }
        }
    }
}
