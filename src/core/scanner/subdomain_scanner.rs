// src/core/scanner/subdomain_scanner.rs

use crate::core::collector::collect;
use crate::core::dispatcher::ConcurrencyBudget;
use crate::core::error::ProbeError;
use crate::core::knowledge_base::USER_AGENTS;
use crate::core::models::{Category, CategoryReport, ProbeOutcome, Target, TaskId};
use crate::core::scanner::ProbeContext;
use reqwest::header::USER_AGENT;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Asks a candidate host for a status code.
pub trait LivenessCheck: Send + Sync + 'static {
    fn status(&self, url: &str, user_agent: &str) -> impl Future<Output = Result<u16, ProbeError>> + Send;
}

pub struct HttpLiveness {
    client: reqwest::Client,
}

impl HttpLiveness {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl LivenessCheck for HttpLiveness {
    async fn status(&self, url: &str, user_agent: &str) -> Result<u16, ProbeError> {
        let response = self.client.get(url).header(USER_AGENT, user_agent).send().await?;
        Ok(response.status().as_u16())
    }
}

/// One candidate label per nonempty line, taken as written apart from surrounding whitespace.
pub fn parse_wordlist(raw: &str) -> Vec<String> {
    raw.lines().map(str::trim).filter(|label| !label.is_empty()).map(str::to_string).collect()
}

pub async fn load_wordlist(path: &Path) -> Result<Vec<String>, ProbeError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProbeError::Other(format!("cannot read wordlist {}: {}", path.display(), e)))?;
    Ok(parse_wordlist(&raw))
}

/// A host is live when any user agent gets a 200 back. The first success wins;
/// transport errors just mean "try the next agent".
pub async fn probe_candidate<C: LivenessCheck>(host: &str, check: &C, agents: &[&str]) -> bool {
    let url = format!("http://{}", host);
    for agent in agents {
        match check.status(&url, agent).await {
            Ok(200) => return true,
            Ok(code) => debug!(host, code, "Candidate answered without 200."),
            Err(e) => debug!(host, error = %e, "Candidate unreachable."),
        }
    }
    false
}

/// Runs the label list through a fixed pool of workers and collects the live hosts.
///
/// Workers pull labels from a shared queue until it is empty. Each candidate is
/// checked in its own task, so a crashing check becomes a failure for that host
/// and the worker moves on to the next label.
pub async fn scan_candidates<C: LivenessCheck>(
    target: &Target,
    labels: Vec<String>,
    workers: ConcurrencyBudget,
    check: Arc<C>,
    agents: &'static [&'static str],
) -> CategoryReport {
    info!(target = %target, candidates = labels.len(), workers = workers.get(), "Enumerating subdomains.");
    let queue = Arc::new(Mutex::new(labels.into_iter()));
    let (tx, rx) = mpsc::unbounded_channel();

    let mut pool = JoinSet::new();
    let mut names = HashMap::new();
    for worker in 0..workers.get() {
        let queue = Arc::clone(&queue);
        let check = Arc::clone(&check);
        let tx = tx.clone();
        let domain = target.to_string();
        let handle = pool.spawn(async move {
            loop {
                // Never hold the lock across an await.
                let next = queue.lock().ok().and_then(|mut labels| labels.next());
                let Some(label) = next else { break };

                let host = format!("{}.{}", label, domain);
                let task_id = TaskId::new(Category::Subdomains, host.clone());
                let outcome = match check_in_task(Arc::clone(&check), host.clone(), agents).await {
                    Ok(true) => ProbeOutcome::Finding { task_id, text: host },
                    Ok(false) => ProbeOutcome::Clear { task_id },
                    Err(e) => {
                        error!(host, error = %e, "Subdomain check aborted.");
                        ProbeOutcome::Failure { task_id, reason: ProbeError::Panicked(e.to_string()).to_string() }
                    }
                };
                if tx.send(outcome).is_err() {
                    break;
                }
            }
        });
        names.insert(handle.id(), worker);
    }

    tokio::spawn(async move {
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                let worker = names.get(&e.id()).copied().unwrap_or_default();
                error!(worker, error = %e, "Subdomain worker died.");
                let _ = tx.send(ProbeOutcome::Failure {
                    task_id: TaskId::new(Category::Subdomains, format!("worker-{}", worker)),
                    reason: ProbeError::Panicked(e.to_string()).to_string(),
                });
            }
        }
    });

    collect(Category::Subdomains, rx).await
}

async fn check_in_task<C: LivenessCheck>(
    check: Arc<C>,
    host: String,
    agents: &'static [&'static str],
) -> Result<bool, tokio::task::JoinError> {
    tokio::spawn(async move { probe_candidate(&host, check.as_ref(), agents).await }).await
}

pub async fn run_subdomain_scan(target: &Target, ctx: &ProbeContext) -> CategoryReport {
    let labels = match load_wordlist(&ctx.config.wordlist_path).await {
        Ok(labels) => labels,
        Err(e) => {
            warn!(error = %e, "Subdomain scan aborted.");
            return CategoryReport::aborted(Category::Subdomains, target.as_str(), e.to_string());
        }
    };
    let check = Arc::new(HttpLiveness::new(ctx.http.clone()));
    scan_candidates(target, labels, ctx.config.subdomain_workers(), check, USER_AGENTS).await
}
