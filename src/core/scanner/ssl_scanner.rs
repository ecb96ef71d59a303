// src/core/scanner/ssl_scanner.rs

use tracing::{debug, error, info};

use crate::core::error::ProbeError;
use crate::core::models::{ProbeResult, Target};
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::spawn_blocking;
use x509_parser::prelude::*;

/// Connects to port 443 and describes the leaf certificate.
///
/// Invalid or expired certificates are still read and described; judging
/// the chain is the grading probe's job.
pub async fn run_ssl_scan(target: &Target, limit: Duration) -> ProbeResult {
    info!(target = %target, "Starting TLS certificate probe.");
    let host = target.to_string();

    debug!("Spawning blocking task for TLS connection.");
    let scan = spawn_blocking(move || fetch_certificate(&host, limit)).await.unwrap_or_else(|e| {
        error!(panic = %e, "Blocking TLS task panicked.");
        Err(ProbeError::Panicked(e.to_string()))
    })?;

    match scan {
        Some(der) => describe_certificate(&der, Utc::now()).map(Some),
        None => Ok(None),
    }
}

fn fetch_certificate(host: &str, limit: Duration) -> Result<Option<Vec<u8>>, ProbeError> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| ProbeError::Tls(e.to_string()))?;

    let addr = (host, 443)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| ProbeError::InvalidTarget(format!("{} has no address", host)))?;

    debug!(host, %addr, "Connecting TCP stream to port 443.");
    let stream = TcpStream::connect_timeout(&addr, limit)?;
    stream.set_read_timeout(Some(limit))?;
    stream.set_write_timeout(Some(limit))?;

    debug!(host, "Performing TLS handshake.");
    let stream = connector.connect(host, stream).map_err(|e| ProbeError::Tls(e.to_string()))?;

    match stream.peer_certificate() {
        Ok(Some(cert)) => Ok(Some(cert.to_der().map_err(|e| ProbeError::Tls(e.to_string()))?)),
        Ok(None) => {
            debug!("Handshake completed without a peer certificate.");
            Ok(None)
        }
        Err(e) => Err(ProbeError::Tls(e.to_string())),
    }
}

/// Issuer, subject, validity window and days left, one field per line.
pub fn describe_certificate(der: &[u8], now: DateTime<Utc>) -> Result<String, ProbeError> {
    let (_, x509) = parse_x509_certificate(der).map_err(|e| ProbeError::Malformed(e.to_string()))?;
    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Parsed certificate.");

    let common_name = x509
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or("-");

    let validity = x509.validity();
    let not_before = asn1_time_to_chrono_utc(&validity.not_before);
    let not_after = asn1_time_to_chrono_utc(&validity.not_after);
    let days_left = not_after.signed_duration_since(now).num_days();

    let status = if now < not_before {
        "not yet valid".to_string()
    } else if now > not_after {
        format!("expired {} days ago", -days_left)
    } else {
        format!("valid, expires in {} days", days_left)
    };

    Ok(format!(
        "Issuer: {}\nCommon Name: {}\nSubject: {}\nValidity: {} - {}\nStatus: {}",
        x509.issuer(),
        common_name,
        x509.subject(),
        not_before.format("%Y-%m-%d %H:%M:%S UTC"),
        not_after.format("%Y-%m-%d %H:%M:%S UTC"),
        status
    ))
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use x509_parser::pem::parse_x509_pem;

    // Self-signed, valid 2000-01-01 to 2100-01-01.
    const VALID_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBUDCB+AIBATAKBggqhkjOPQQDAjA0MRswGQYDVQQDDBJ2YWxpZC5leGFtcGxl
LnRlc3QxFTATBgNVBAoMDERvbWluZm8gVGVzdDAgFw0wMDAxMDEwMDAwMDBaGA8y
MTAwMDEwMTAwMDAwMFowNDEbMBkGA1UEAwwSdmFsaWQuZXhhbXBsZS50ZXN0MRUw
EwYDVQQKDAxEb21pbmZvIFRlc3QwWTATBgcqhkjOPQIBBggqhkjOPQMBBwNCAAS7
105aELnp99MYkZeUPdgOBy24GvRHpJVn1TsXjuu7eeJQnVilpRWj5c00cvnTZN9B
PfUcqeWqTABdOCVz3+IbMAoGCCqGSM49BAMCA0cAMEQCIC+yGAYbrrYonz1GMBpP
VH8EPcZgOuglOFuATNN/LdPvAiAhUJNYPI2wFr9m+vV4fTYbyEbJotXVlNvV8SId
ZWiQLg==
-----END CERTIFICATE-----
";

    // Self-signed, valid 2000-01-01 to 2001-01-01.
    const EXPIRED_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBVDCB+gIBAjAKBggqhkjOPQQDAjA2MR0wGwYDVQQDDBRleHBpcmVkLmV4YW1w
bGUudGVzdDEVMBMGA1UECgwMRG9taW5mbyBUZXN0MB4XDTAwMDEwMTAwMDAwMFoX
DTAxMDEwMTAwMDAwMFowNjEdMBsGA1UEAwwUZXhwaXJlZC5leGFtcGxlLnRlc3Qx
FTATBgNVBAoMDERvbWluZm8gVGVzdDBZMBMGByqGSM49AgEGCCqGSM49AwEHA0IA
BEsvZOe+HP0hLSER9AiZzB6/Wo9v/+hUEW2yCCbkIhaDw8edYC5chud1qeeDuLkJ
5ozGbyLmGndEjChCig/4+kYwCgYIKoZIzj0EAwIDSQAwRgIhAMTePO3MdEzs1cJ8
sPWJDFKb6VeAaTRj38FeT2o+nH/KAiEArR5LipEAQ7Uetu4hCSxQyePK8cUfAI4C
aI9HKmKdBSw=
-----END CERTIFICATE-----
";

    fn der(pem: &str) -> Vec<u8> {
        let (_, pem) = parse_x509_pem(pem.as_bytes()).unwrap();
        pem.contents
    }

    #[test]
    fn describes_a_valid_certificate() {
        let now = Utc.with_ymd_and_hms(2050, 1, 1, 0, 0, 0).unwrap();
        let text = describe_certificate(&der(VALID_PEM), now).unwrap();
        assert!(text.contains("Common Name: valid.example.test"));
        assert!(text.contains("Validity: 2000-01-01 00:00:00 UTC - 2100-01-01 00:00:00 UTC"));
        assert!(text.contains("Status: valid, expires in"));
    }

    #[test]
    fn flags_an_expired_certificate() {
        let now = Utc.with_ymd_and_hms(2001, 1, 11, 0, 0, 0).unwrap();
        let text = describe_certificate(&der(EXPIRED_PEM), now).unwrap();
        assert!(text.ends_with("Status: expired 10 days ago"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(describe_certificate(b"not a certificate", Utc::now()), Err(ProbeError::Malformed(_))));
    }
}
