// src/core/scanner/fingerprint_scanner.rs

use tracing::{debug, info};
use crate::core::models::{ProbeResult, Target};
use crate::core::scanner::headers_scanner::fetch_first;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, SERVER, SET_COOKIE};

/// Where a rule looks for its signature.
enum Check<'a> {
    /// A pattern in a specific HTTP header.
    Header(&'a str, &'a Lazy<Regex>),
    /// A pattern in any `set-cookie` header.
    Cookie(&'a Lazy<Regex>),
}

struct FingerprintRule<'a> {
    tech_name: &'a str,
    category: &'a str,
    /// Operating system implied by a match. Later matches override earlier ones.
    os: Option<&'a str>,
    check: Check<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
}

// The first capture group, when present, is the version.
static RE_NGINX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)nginx(?:/([\d.]+))?").unwrap());
static RE_APACHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)apache(?:/([\d.]+))?").unwrap());
static RE_IIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)microsoft-iis(?:/([\d.]+))?").unwrap());
static RE_CLOUDFLARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)cloudflare").unwrap());
static RE_LITESPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)litespeed").unwrap());
static RE_PHP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)php(?:/([\d.]+))?").unwrap());
static RE_PHPSESSID: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHPSESSID").unwrap());
static RE_ASPNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)asp\.net").unwrap());
static RE_ASPNET_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d.]+)").unwrap());
static RE_EXPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)express").unwrap());
static RE_NODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)node\.?js").unwrap());
static RE_NEXTJS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)next\.js ?([\d.]+)?").unwrap());
static RE_JAVA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)servlet|jsp|java").unwrap());
static RE_JSESSIONID: Lazy<Regex> = Lazy::new(|| Regex::new(r"JSESSIONID").unwrap());
static RE_DJANGO_CSRF: Lazy<Regex> = Lazy::new(|| Regex::new(r"csrftoken").unwrap());
static RE_RUBY_RAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_rails_session").unwrap());
static RE_SHOPIFY: Lazy<Regex> = Lazy::new(|| Regex::new(r".+").unwrap());
static RE_MAGENTO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)magento|frontend=").unwrap());

static RULES: &[FingerprintRule] = &[
    FingerprintRule { tech_name: "Nginx", category: "Web Server", os: Some("Linux/Unix"), check: Check::Header("server", &RE_NGINX) },
    FingerprintRule { tech_name: "Apache", category: "Web Server", os: Some("Linux/Unix"), check: Check::Header("server", &RE_APACHE) },
    FingerprintRule { tech_name: "IIS", category: "Web Server", os: Some("Windows"), check: Check::Header("server", &RE_IIS) },
    FingerprintRule { tech_name: "Cloudflare", category: "CDN / WAF", os: None, check: Check::Header("server", &RE_CLOUDFLARE) },
    FingerprintRule { tech_name: "LiteSpeed", category: "Web Server", os: None, check: Check::Header("server", &RE_LITESPEED) },
    FingerprintRule { tech_name: "PHP", category: "Language", os: None, check: Check::Header("x-powered-by", &RE_PHP) },
    FingerprintRule { tech_name: "PHP", category: "Language", os: None, check: Check::Cookie(&RE_PHPSESSID) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", os: Some("Windows"), check: Check::Header("x-powered-by", &RE_ASPNET) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", os: Some("Windows"), check: Check::Header("x-aspnet-version", &RE_ASPNET_VERSION) },
    FingerprintRule { tech_name: "Express", category: "Framework", os: None, check: Check::Header("x-powered-by", &RE_EXPRESS) },
    FingerprintRule { tech_name: "Node.js", category: "Runtime", os: None, check: Check::Header("x-powered-by", &RE_NODE) },
    FingerprintRule { tech_name: "Next.js", category: "JS Framework", os: None, check: Check::Header("x-powered-by", &RE_NEXTJS) },
    FingerprintRule { tech_name: "Java", category: "Language", os: None, check: Check::Header("x-powered-by", &RE_JAVA) },
    FingerprintRule { tech_name: "Java", category: "Language", os: None, check: Check::Cookie(&RE_JSESSIONID) },
    FingerprintRule { tech_name: "Python/Django", category: "Framework", os: None, check: Check::Cookie(&RE_DJANGO_CSRF) },
    FingerprintRule { tech_name: "Ruby on Rails", category: "Framework", os: None, check: Check::Cookie(&RE_RUBY_RAILS) },
    FingerprintRule { tech_name: "Shopify", category: "E-commerce", os: None, check: Check::Header("x-shopid", &RE_SHOPIFY) },
    FingerprintRule { tech_name: "Magento", category: "E-commerce", os: None, check: Check::Cookie(&RE_MAGENTO) },
];

/// Fetches the front page (HTTP first, then HTTPS) and fingerprints its response headers.
/// Certificate errors are ignored by the caller's client.
pub async fn run_fingerprint_scan(client: &reqwest::Client, target: &Target) -> ProbeResult {
    info!(target = %target, "Starting fingerprint scan.");
    let urls = [format!("http://{}", target), format!("https://{}", target)];
    let (url, headers) = fetch_first(client, &urls).await?;
    debug!(url = %url, "Fingerprinting response headers.");
    Ok(fingerprint(&headers))
}

/// Applies every rule and renders what matched, or `None` when nothing did.
pub fn fingerprint(headers: &HeaderMap) -> Option<String> {
    let (technologies, os) = detect(headers);
    let mut lines = Vec::new();

    if let Some(server) = headers.get(SERVER).and_then(|v| v.to_str().ok()) {
        lines.push(format!("Server: {}", server));
    }
    if let Some(powered_by) = headers.get("x-powered-by").and_then(|v| v.to_str().ok()) {
        lines.push(format!("X-Powered-By: {}", powered_by));
    }
    for tech in &technologies {
        match &tech.version {
            Some(version) => lines.push(format!("Technology: {} {} ({})", tech.name, version, tech.category)),
            None => lines.push(format!("Technology: {} ({})", tech.name, tech.category)),
        }
    }
    if let Some(os) = os {
        lines.push(format!("Operating System: {}", os));
    }

    info!(count = technologies.len(), "Fingerprint scan finished.");
    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

/// Technologies in rule order, deduplicated by name, plus the inferred OS.
fn detect(headers: &HeaderMap) -> (Vec<Technology>, Option<&'static str>) {
    let cookies = headers
        .get_all(SET_COOKIE)
        .into_iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let mut found: Vec<Technology> = Vec::new();
    let mut os = None;

    for rule in RULES {
        let version = match &rule.check {
            Check::Header(name, re) => check_with_regex(headers.get(*name).and_then(|v| v.to_str().ok()), re),
            Check::Cookie(re) => check_with_regex(Some(&cookies), re),
        };
        let Some(version) = version else { continue };

        debug!(tech = %rule.tech_name, version = ?version, "Rule matched.");
        if rule.os.is_some() {
            os = rule.os;
        }
        match found.iter_mut().find(|t| t.name == rule.tech_name) {
            Some(existing) => {
                if existing.version.is_none() && version.is_some() {
                    existing.version = version;
                }
            }
            None => found.push(Technology {
                name: rule.tech_name.to_string(),
                category: rule.category.to_string(),
                version,
            }),
        }
    }
    (found, os)
}

/// `None` if the pattern does not match, `Some(None)` if it matches without a
/// captured version, `Some(Some(v))` otherwise.
fn check_with_regex(text_option: Option<&str>, re: &Regex) -> Option<Option<String>> {
    text_option.and_then(|text| {
        re.captures(text)
            .map(|caps| caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn nginx_with_php_is_linux() {
        let map = headers(&[("server", "nginx/1.18.0"), ("x-powered-by", "PHP/7.4.3")]);
        let text = fingerprint(&map).unwrap();
        assert!(text.contains("Technology: Nginx 1.18.0 (Web Server)"));
        assert!(text.contains("Technology: PHP 7.4.3 (Language)"));
        assert!(text.ends_with("Operating System: Linux/Unix"));
    }

    #[test]
    fn iis_with_aspnet_is_windows() {
        let map = headers(&[("server", "Microsoft-IIS/10.0"), ("x-aspnet-version", "4.0.30319")]);
        let (techs, os) = detect(&map);
        let names: Vec<&str> = techs.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["IIS", "ASP.NET"]);
        assert_eq!(techs[1].version.as_deref(), Some("4.0.30319"));
        assert_eq!(os, Some("Windows"));
    }

    #[test]
    fn repeated_matches_collapse_into_one_entry() {
        let map = headers(&[("set-cookie", "PHPSESSID=abc; path=/"), ("x-powered-by", "PHP/8.2.1")]);
        let (techs, _) = detect(&map);
        assert_eq!(techs.len(), 1);
        assert_eq!(techs[0].version.as_deref(), Some("8.2.1"));
    }

    #[test]
    fn bare_response_detects_nothing() {
        assert_eq!(fingerprint(&headers(&[("content-type", "text/html")])), None);
    }
}
