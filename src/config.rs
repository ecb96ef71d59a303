// src/config.rs

use crate::core::dispatcher::ConcurrencyBudget;
use crate::logging::project_directory;
use color_eyre::eyre::{Result, WrapErr, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Environment variable that overrides the subdomain wordlist location.
pub const WORDLIST_ENV: &str = "DOMINFO_WORDLIST";
const CONFIG_FILE: &str = "config.json";

/// Tunables for every probe set. Loaded once at start, then shared read-only.
///
/// Every field has a default, so a partial `config.json` only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Concurrent connection attempts for the port scan.
    pub port_budget: usize,
    /// Concurrent DNSBL queries; kept low so the blacklist services do not rate-limit us.
    pub blacklist_budget: usize,
    /// Size of the subdomain worker pool.
    pub subdomain_workers: usize,
    pub connect_timeout_ms: u64,
    pub dns_timeout_secs: u64,
    pub whois_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub tls_timeout_secs: u64,
    pub waf_timeout_secs: u64,
    pub grading_poll_interval_secs: u64,
    pub grading_deadline_secs: u64,
    pub grading_endpoint: String,
    pub wordlist_path: PathBuf,
    pub waf_command: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            port_budget: 100,
            blacklist_budget: 10,
            subdomain_workers: 20,
            connect_timeout_ms: 500,
            dns_timeout_secs: 5,
            whois_timeout_secs: 10,
            http_timeout_secs: 10,
            tls_timeout_secs: 10,
            waf_timeout_secs: 120,
            grading_poll_interval_secs: 5,
            grading_deadline_secs: 300,
            grading_endpoint: "https://api.ssllabs.com/api/v3/analyze".to_string(),
            wordlist_path: PathBuf::from("subdomains.txt"),
            waf_command: "wafw00f".to_string(),
        }
    }
}

impl ScanConfig {
    /// Reads `config.json` from the platform config directory when present,
    /// then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)
                    .wrap_err_with(|| format!("reading {}", path.display()))?;
                info!(path = %path.display(), "Loaded configuration file.");
                Self::from_json(&raw)?
            }
            _ => Self::default(),
        };

        if let Ok(path) = std::env::var(WORDLIST_ENV) {
            config.wordlist_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).wrap_err("invalid configuration file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("port_budget", self.port_budget),
            ("blacklist_budget", self.blacklist_budget),
            ("subdomain_workers", self.subdomain_workers),
        ] {
            if value == 0 {
                bail!("{name} must be at least 1");
            }
        }
        if self.grading_poll_interval_secs == 0 {
            bail!("grading_poll_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn port_budget(&self) -> ConcurrencyBudget {
        ConcurrencyBudget::new(self.port_budget).unwrap_or(ConcurrencyBudget::SINGLE)
    }

    pub fn blacklist_budget(&self) -> ConcurrencyBudget {
        ConcurrencyBudget::new(self.blacklist_budget).unwrap_or(ConcurrencyBudget::SINGLE)
    }

    pub fn subdomain_workers(&self) -> ConcurrencyBudget {
        ConcurrencyBudget::new(self.subdomain_workers).unwrap_or(ConcurrencyBudget::SINGLE)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_secs(self.whois_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_timeout_secs)
    }

    pub fn waf_timeout(&self) -> Duration {
        Duration::from_secs(self.waf_timeout_secs)
    }

    pub fn grading_poll_interval(&self) -> Duration {
        Duration::from_secs(self.grading_poll_interval_secs)
    }

    pub fn grading_deadline(&self) -> Duration {
        Duration::from_secs(self.grading_deadline_secs)
    }
}

fn config_path() -> Option<PathBuf> {
    project_directory().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ScanConfig::from_json(r#"{ "blacklist_budget": 4, "wordlist_path": "/tmp/words.txt" }"#).unwrap();
        assert_eq!(config.blacklist_budget().get(), 4);
        assert_eq!(config.wordlist_path, PathBuf::from("/tmp/words.txt"));
        assert_eq!(config.port_budget().get(), 100);
        assert_eq!(config.connect_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn zero_budget_is_rejected() {
        assert!(ScanConfig::from_json(r#"{ "port_budget": 0 }"#).is_err());
        assert!(ScanConfig::from_json(r#"{ "subdomain_workers": 0 }"#).is_err());
    }

    #[test]
    fn blacklist_budget_is_smaller_than_port_budget_by_default() {
        let config = ScanConfig::default();
        assert!(config.blacklist_budget < config.port_budget);
        assert!(config.validate().is_ok());
    }
}
