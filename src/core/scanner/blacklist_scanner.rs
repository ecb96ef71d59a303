// src/core/scanner/blacklist_scanner.rs

use crate::core::dispatcher::ProbeTask;
use crate::core::error::ProbeError;
use crate::core::knowledge_base::{BLACKLIST_SERVICES, BlacklistService};
use crate::core::models::{Category, Target, TaskId};
use crate::core::scanner::ProbeContext;
use crate::core::scanner::dns_scanner::is_no_records;
use hickory_resolver::TokioAsyncResolver;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::{debug, info};

/// Answers "does this name exist?" for reverse-octet DNSBL queries.
///
/// `Ok(false)` means the name does not exist (not listed). Any other DNS
/// problem is an error, never a silent "not listed".
pub trait BlacklistLookup: Send + Sync + 'static {
    fn resolves(&self, name: &str) -> impl Future<Output = Result<bool, ProbeError>> + Send;
}

impl BlacklistLookup for TokioAsyncResolver {
    async fn resolves(&self, name: &str) -> Result<bool, ProbeError> {
        match self.ipv4_lookup(name).await {
            Ok(lookup) => Ok(lookup.iter().next().is_some()),
            Err(e) if is_no_records(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// `93.184.216.34` becomes `34.216.184.93`.
pub fn reverse_octets(ip: Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{d}.{c}.{b}.{a}")
}

/// Resolves the target's IPv4 addresses. Failure here aborts the whole category.
pub async fn resolve_ipv4(resolver: &TokioAsyncResolver, target: &Target) -> Result<Vec<Ipv4Addr>, ProbeError> {
    if let Ok(ip) = target.as_str().parse::<Ipv4Addr>() {
        return Ok(vec![ip]);
    }
    let lookup = resolver.lookup_ip(format!("{}.", target)).await?;
    let mut addrs: Vec<Ipv4Addr> = lookup
        .iter()
        .filter_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .collect();
    addrs.sort();
    addrs.dedup();

    if addrs.is_empty() {
        return Err(ProbeError::Other(format!("{} has no IPv4 addresses", target)));
    }
    Ok(addrs)
}

/// Resolves the target and builds one task per (address, service) pair.
pub async fn blacklist_tasks(target: &Target, ctx: &ProbeContext) -> Result<Vec<ProbeTask>, ProbeError> {
    let addrs = resolve_ipv4(&ctx.resolver, target).await?;
    info!(target = %target, addresses = addrs.len(), services = BLACKLIST_SERVICES.len(), "Checking blacklists.");
    Ok(check_tasks(&addrs, BLACKLIST_SERVICES, Arc::new(ctx.resolver.clone())))
}

/// The cartesian product {address} x {service}; results group under the address.
pub fn check_tasks<L: BlacklistLookup>(
    addrs: &[Ipv4Addr],
    services: &[BlacklistService],
    lookup: Arc<L>,
) -> Vec<ProbeTask> {
    let mut tasks = Vec::with_capacity(addrs.len() * services.len());
    for &ip in addrs {
        for &service in services {
            let lookup = Arc::clone(&lookup);
            let id = TaskId::new(Category::Blacklist, service.zone).with_entity(ip.to_string());
            tasks.push(ProbeTask::new(id, async move {
                // Trailing dot: search domains must never be appended to these queries.
                let query = format!("{}.{}.", reverse_octets(ip), service.zone);
                if lookup.resolves(&query).await? {
                    debug!(%ip, zone = service.zone, "Address is listed.");
                    Ok(Some(format!("{}: {}", service.name, service.zone)))
                } else {
                    Ok(None)
                }
            }));
        }
    }
    tasks
}
