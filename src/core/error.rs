// src/core/error.rs

use hickory_resolver::error::ResolveError;
use std::time::Duration;
use thiserror::Error;

/// Everything that can stop a single probe from reaching a definitive answer.
///
/// Expected negatives (closed port, not listed, no WAF) are never represented
/// here; probes report those as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("DNS error: {0}")]
    Dns(#[from] ResolveError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("external tool error: {0}")]
    External(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("probe panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

