// src/core/scanner/headers_scanner.rs

use tracing::{debug, info, warn};
use crate::core::error::ProbeError;
use crate::core::knowledge_base::{HeaderReference, SECURITY_HEADERS};
use crate::core::models::{ProbeResult, Target};
use reqwest::header::HeaderMap;

/// Returns the value of `name` if present. Non-UTF-8 values still count as present.
fn check_header(headers: &HeaderMap, name: &str) -> Option<String> {
    debug!(header_name = name, "Checking for header.");
    let value = headers.get(name)?;
    match value.to_str() {
        Ok(s) => Some(s.to_string()),
        Err(_) => {
            warn!(header_name = name, "Header found but contained invalid UTF-8.");
            Some("[Invalid UTF-8]".to_string())
        }
    }
}

/// Audits the reference headers against whichever scheme answers first, HTTPS before HTTP.
pub async fn run_headers_scan(client: &reqwest::Client, target: &Target) -> ProbeResult {
    info!(target = %target, "Starting headers scan.");
    let urls = [format!("https://{}", target), format!("http://{}", target)];
    let (url, headers) = fetch_first(client, &urls).await?;
    info!(url = %url, "Auditing response headers.");
    Ok(Some(format!("Security headers for {}\n{}", url, audit_headers(&headers, SECURITY_HEADERS))))
}

/// The first URL that produces any HTTP response wins; the last error is kept otherwise.
pub async fn fetch_first(client: &reqwest::Client, urls: &[String]) -> Result<(String, HeaderMap), ProbeError> {
    let mut last_error = ProbeError::InvalidTarget("no URL to try".to_string());
    for url in urls {
        match client.get(url).send().await {
            Ok(response) => {
                debug!(url, status = %response.status(), "Received HTTP response.");
                return Ok((url.clone(), response.headers().clone()));
            }
            Err(e) => {
                debug!(url, error = %e, "HTTP request failed.");
                last_error = e.into();
            }
        }
    }
    Err(last_error)
}

/// One line per reference header, in table order.
pub fn audit_headers(headers: &HeaderMap, reference: &[HeaderReference]) -> String {
    reference
        .iter()
        .map(|entry| match check_header(headers, entry.name) {
            Some(value) => format!("{}: Found ({})", entry.name, value),
            None => format!("{}: Not Found (suggested: {})", entry.name, entry.recommended),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn audit_marks_present_and_missing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));
        headers.insert("x-content-type-options", HeaderValue::from_bytes(b"nos\xffiff").unwrap());

        let audit = audit_headers(&headers, &SECURITY_HEADERS[..4]);
        let lines: Vec<&str> = audit.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Content-Security-Policy: Not Found (suggested: default-src 'self')");
        assert_eq!(lines[2], "X-Content-Type-Options: Found ([Invalid UTF-8])");
        assert_eq!(lines[3], "X-Frame-Options: Found (SAMEORIGIN)");
    }

    #[tokio::test]
    async fn falls_back_to_the_next_url() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nStrict-Transport-Security: max-age=60\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = dead.local_addr().unwrap().port();
        drop(dead);

        let urls = [format!("http://127.0.0.1:{dead_port}/"), format!("http://127.0.0.1:{port}/")];
        let (url, headers) = fetch_first(&reqwest::Client::new(), &urls).await.unwrap();
        assert_eq!(url, urls[1]);
        assert_eq!(headers.get("strict-transport-security").unwrap(), "max-age=60");
    }

    #[tokio::test]
    async fn no_answer_at_all_is_a_failure() {
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = dead.local_addr().unwrap().port();
        drop(dead);
        let result = fetch_first(&reqwest::Client::new(), &[format!("http://127.0.0.1:{port}/")]).await;
        assert!(matches!(result, Err(ProbeError::Http(_))));
    }
}
