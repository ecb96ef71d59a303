// src/core/scanner/whois_scanner.rs

use crate::core::deadline::with_timeout;
use crate::core::error::ProbeError;
use crate::core::knowledge_base::WHOIS_FIELDS;
use crate::core::models::{ProbeResult, Target};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

const WHOIS_PORT: u16 = 43;
const ROOT_SERVER: &str = "whois.iana.org";
const FALLBACK_SERVER: &str = "whois.verisign-grs.com";

/// Asks IANA which registry is authoritative, then asks that registry.
pub async fn run_whois_scan(target: &Target, limit: Duration) -> ProbeResult {
    lookup(target, ROOT_SERVER, WHOIS_PORT, limit).await
}

async fn lookup(target: &Target, root: &str, port: u16, limit: Duration) -> ProbeResult {
    let referral = query_whois(root, port, target.as_str(), limit).await?;
    let server = parse_referral(&referral).unwrap_or_else(|| {
        debug!(target = %target, "No referral from root server, using fallback.");
        FALLBACK_SERVER.to_string()
    });
    info!(target = %target, server, "Querying registry whois server.");

    let response = query_whois(&server, port, target.as_str(), limit).await?;
    Ok(filter_fields(&response))
}

/// One plain-text exchange: send the query line, read until the server closes.
pub async fn query_whois(server: &str, port: u16, query: &str, limit: Duration) -> Result<String, ProbeError> {
    with_timeout(limit, async {
        let mut stream = TcpStream::connect((server, port)).await?;
        stream.write_all(format!("{}\r\n", query).as_bytes()).await?;
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    })
    .await
}

/// The `refer:` line of an IANA response names the registry server.
pub fn parse_referral(response: &str) -> Option<String> {
    response
        .lines()
        .find_map(|line| line.trim().strip_prefix("refer:"))
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
}

/// Keeps only the well-known registration fields, in response order.
pub fn filter_fields(response: &str) -> Option<String> {
    let kept: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|line| WHOIS_FIELDS.iter().any(|field| line.starts_with(field)))
        .collect();
    if kept.is_empty() { None } else { Some(kept.join("\n")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const REGISTRY_RESPONSE: &str = "   Domain Name: EXAMPLE.COM\r\n   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r\n   Registrar: RESERVED-Internet Assigned Numbers Authority\r\n   Name Server: A.IANA-SERVERS.NET\r\n>>> Last update of whois database <<<\r\n";

    #[test]
    fn referral_is_read_from_refer_line() {
        let iana = "% IANA WHOIS server\n\nrefer:        whois.verisign-grs.com\n\ndomain:       COM\n";
        assert_eq!(parse_referral(iana).as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(parse_referral("domain: COM\n"), None);
    }

    #[test]
    fn filter_keeps_known_fields_only() {
        let filtered = filter_fields(REGISTRY_RESPONSE).unwrap();
        assert_eq!(
            filtered,
            "Domain Name: EXAMPLE.COM\nRegistrar: RESERVED-Internet Assigned Numbers Authority\nName Server: A.IANA-SERVERS.NET"
        );
        assert_eq!(filter_fields("% nothing here\n"), None);
    }

    #[tokio::test]
    async fn follows_referral_to_registry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let mut queries = Vec::new();
            for reply in ["refer: 127.0.0.1\n".to_string(), REGISTRY_RESPONSE.to_string()] {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 256];
                let n = socket.read(&mut buf).await.unwrap();
                queries.push(String::from_utf8_lossy(&buf[..n]).into_owned());
                socket.write_all(reply.as_bytes()).await.unwrap();
            }
            queries
        });

        let target = Target::parse("example.com").unwrap();
        let result = lookup(&target, "127.0.0.1", port, Duration::from_secs(2)).await.unwrap();
        assert!(result.unwrap().starts_with("Domain Name: EXAMPLE.COM"));
        assert_eq!(server.await.unwrap(), vec!["example.com\r\n", "example.com\r\n"]);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let result = query_whois("127.0.0.1", port, "example.com", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(ProbeError::Timeout(_))));
    }
}
