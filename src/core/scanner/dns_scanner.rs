// src/core/scanner/dns_scanner.rs

use tracing::{debug, info, warn};

use crate::core::error::ProbeError;
use crate::core::models::{ProbeResult, Target};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::RecordType;

/// "The name exists but has no records of that type" (or does not exist at all).
/// Both are expected negatives, not failures.
pub(crate) fn is_no_records(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

/// Looks up A, AAAA, MX, CNAME, TXT and NS concurrently and lists the answers in that order.
pub async fn run_dns_scan(resolver: &TokioAsyncResolver, target: &Target) -> ProbeResult {
    info!(target = %target, "Starting DNS records lookup.");
    let name = format!("{}.", target);

    let (a, aaaa, mx, cname, txt, ns) = tokio::join!(
        lookup_records(resolver, &name, RecordType::A),
        lookup_records(resolver, &name, RecordType::AAAA),
        lookup_records(resolver, &name, RecordType::MX),
        lookup_records(resolver, &name, RecordType::CNAME),
        lookup_records(resolver, &name, RecordType::TXT),
        lookup_records(resolver, &name, RecordType::NS),
    );

    summarize(vec![a, aaaa, mx, cname, txt, ns])
}

async fn lookup_records(
    resolver: &TokioAsyncResolver,
    name: &str,
    record_type: RecordType,
) -> Result<Vec<String>, ProbeError> {
    match resolver.lookup(name, record_type).await {
        Ok(lookup) => {
            // A CNAME chain may answer an A query; keep only what was asked for.
            let records: Vec<String> = lookup
                .record_iter()
                .filter(|record| record.record_type() == record_type)
                .map(|record| record.to_string())
                .collect();
            debug!(name, %record_type, count = records.len(), "Records found.");
            Ok(records)
        }
        Err(e) if is_no_records(&e) => Ok(Vec::new()),
        Err(e) => {
            warn!(name, %record_type, error = %e, "DNS lookup failed.");
            Err(e.into())
        }
    }
}

/// Joins every answer. Partial failures are tolerated as long as something
/// came back; only when nothing did is the last error surfaced.
pub fn summarize(per_type: Vec<Result<Vec<String>, ProbeError>>) -> ProbeResult {
    let mut lines = Vec::new();
    let mut last_error = None;
    for result in per_type {
        match result {
            Ok(records) => lines.extend(records),
            Err(e) => last_error = Some(e),
        }
    }

    match (lines.is_empty(), last_error) {
        (true, Some(e)) => Err(e),
        (true, None) => Ok(None),
        (false, _) => Ok(Some(lines.join("\n"))),
    }
}

/// A zone publishing DNSKEY records is treated as DNSSEC-enabled.
pub async fn run_dnssec_scan(resolver: &TokioAsyncResolver, target: &Target) -> ProbeResult {
    let name = format!("{}.", target);
    let keys = lookup_records(resolver, &name, RecordType::DNSKEY).await?;
    info!(target = %target, keys = keys.len(), "DNSKEY lookup finished.");
    if keys.is_empty() {
        Ok(None)
    } else {
        Ok(Some(format!("DNSSEC is enabled ({} DNSKEY records).", keys.len())))
    }
}
