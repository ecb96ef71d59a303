// src/core/scanner/mod.rs

// Every probe set lives in its own module; this file composes them into sessions.
pub mod axfr_scanner;
pub mod blacklist_scanner;
pub mod dns_scanner;
pub mod fingerprint_scanner;
pub mod grading_scanner;
pub mod headers_scanner;
pub mod port_scanner;
pub mod ssl_scanner;
pub mod subdomain_scanner;
pub mod waf_scanner;
pub mod whois_scanner;

use crate::config::ScanConfig;
use crate::core::collector::collect;
use crate::core::dispatcher::{ConcurrencyBudget, Dispatcher, ProbeTask};
use crate::core::error::ProbeError;
use crate::core::knowledge_base::PORT_SERVICES;
use crate::core::models::{Category, CategoryReport, SessionKind, SessionReport, Target, TaskId};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Shared, cheaply cloneable handles every probe may use.
#[derive(Clone)]
pub struct ProbeContext {
    pub config: Arc<ScanConfig>,
    pub resolver: TokioAsyncResolver,
    pub http: reqwest::Client,
    /// Accepts invalid certificates; only used for server fingerprinting.
    pub insecure_http: reqwest::Client,
}

impl ProbeContext {
    pub fn new(config: Arc<ScanConfig>) -> Result<Self, ProbeError> {
        // Prefer the system resolver: DNS blacklists refuse queries relayed by public resolvers.
        let (resolver_config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(system) => system,
            Err(e) => {
                warn!(error = %e, "Could not read system resolver configuration, using defaults.");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = config.dns_timeout();
        opts.attempts = 1;
        let resolver = TokioAsyncResolver::tokio(resolver_config, opts);

        let user_agent = concat!("dominfo-rs/", env!("CARGO_PKG_VERSION"));
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(config.http_timeout())
            .build()?;
        let insecure_http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(config.http_timeout())
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { config, resolver, http, insecure_http })
    }
}

/// The only input validation the scanner does: the name has to resolve.
pub async fn ensure_resolvable(resolver: &TokioAsyncResolver, target: &Target) -> Result<(), ProbeError> {
    if target.as_str().parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    let lookup = resolver.lookup_ip(format!("{}.", target)).await?;
    if lookup.iter().next().is_none() {
        return Err(ProbeError::InvalidTarget(format!("{} does not resolve", target)));
    }
    Ok(())
}

/// Runs every category of `kind` concurrently and returns the frozen report.
///
/// A category's failure never affects its siblings; only an unresolvable
/// target aborts the whole session.
pub async fn run_session(target: Target, kind: SessionKind, ctx: ProbeContext) -> Result<SessionReport, ProbeError> {
    info!(target = %target, session = ?kind, "Starting scan session.");
    ensure_resolvable(&ctx.resolver, &target).await?;

    let mut report = SessionReport::start(target.clone(), kind);
    let mut categories = JoinSet::new();
    for category in kind.categories() {
        let target = target.clone();
        let ctx = ctx.clone();
        categories.spawn(async move {
            let subject = target.to_string();
            match tokio::spawn(run_category(category, target, ctx)).await {
                Ok(report) => report,
                Err(e) => {
                    error!(category = %category, error = %e, "Category task aborted.");
                    CategoryReport::aborted(category, &subject, ProbeError::Panicked(e.to_string()).to_string())
                }
            }
        });
    }

    while let Some(joined) = categories.join_next().await {
        match joined {
            Ok(category_report) => report.add(category_report),
            Err(e) => error!(error = %e, "Category slot terminated abnormally."),
        }
    }

    let report = report.finish();
    info!(
        target = %report.target,
        findings = report.finding_count(),
        failures = report.failures().count(),
        "Scan session finished."
    );
    Ok(report)
}

/// Builds the probe set for one category and runs it through its own dispatcher.
pub async fn run_category(category: Category, target: Target, ctx: ProbeContext) -> CategoryReport {
    let planned = match category {
        Category::Subdomains => return subdomain_scanner::run_subdomain_scan(&target, &ctx).await,
        Category::Ports => Ok((
            port_scanner::port_tasks(&target, PORT_SERVICES, ctx.config.connect_timeout()),
            ctx.config.port_budget(),
        )),
        Category::Blacklist => blacklist_scanner::blacklist_tasks(&target, &ctx)
            .await
            .map(|tasks| (tasks, ctx.config.blacklist_budget())),
        single => Ok((vec![single_probe(single, &target, &ctx)], ConcurrencyBudget::SINGLE)),
    };

    match planned {
        Ok((tasks, budget)) => {
            let dispatcher = Dispatcher::new(budget);
            info!(category = %category, tasks = tasks.len(), budget = dispatcher.budget().get(), "Running category.");
            collect(category, dispatcher.spawn(tasks)).await
        }
        Err(e) => {
            warn!(category = %category, error = %e, "Category precondition failed.");
            CategoryReport::aborted(category, target.as_str(), e.to_string())
        }
    }
}

/// Categories that consist of exactly one probe against the target.
fn single_probe(category: Category, target: &Target, ctx: &ProbeContext) -> ProbeTask {
    let id = TaskId::new(category, target.as_str());
    let target = target.clone();
    let ctx = ctx.clone();
    let config = Arc::clone(&ctx.config);

    match category {
        Category::Whois => ProbeTask::new(id, async move {
            whois_scanner::run_whois_scan(&target, config.whois_timeout()).await
        }),
        Category::DnsRecords => ProbeTask::new(id, async move {
            dns_scanner::run_dns_scan(&ctx.resolver, &target).await
        }),
        Category::Dnssec => ProbeTask::new(id, async move {
            dns_scanner::run_dnssec_scan(&ctx.resolver, &target).await
        }),
        Category::ZoneTransfer => ProbeTask::new(id, async move {
            axfr_scanner::run_zone_transfer_scan(&ctx.resolver, &target, config.dns_timeout()).await
        }),
        Category::TlsCertificate => ProbeTask::new(id, async move {
            ssl_scanner::run_ssl_scan(&target, config.tls_timeout()).await
        }),
        Category::TlsGrading => ProbeTask::new(id, async move {
            grading_scanner::run_grading_scan(
                &ctx.http,
                &config.grading_endpoint,
                &target,
                config.grading_poll_interval(),
                config.grading_deadline(),
            )
            .await
        }),
        Category::SecurityHeaders => ProbeTask::new(id, async move {
            headers_scanner::run_headers_scan(&ctx.http, &target).await
        }),
        Category::Waf => ProbeTask::new(id, async move {
            waf_scanner::run_waf_scan(&config.waf_command, &target, config.waf_timeout()).await
        }),
        Category::ServerTech => ProbeTask::new(id, async move {
            fingerprint_scanner::run_fingerprint_scan(&ctx.insecure_http, &target).await
        }),
        Category::Ports | Category::Subdomains | Category::Blacklist => {
            ProbeTask::new(id, async move { Err(ProbeError::Other(format!("{category} is not a single-probe category"))) })
        }
    }
}
