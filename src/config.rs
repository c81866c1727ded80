use std::str::FromStr;

use crate::models::SeverityTier;

/// Application-level constants
pub const APP_NAME: &str = "MediScan Portal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Imaging API used by the portal when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:9000";

/// Per-request timeout for every remote call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const ENV_API_URL: &str = "MEDISCAN_API_URL";
const ENV_TIMEOUT: &str = "MEDISCAN_TIMEOUT_SECS";
const ENV_SEVERITY: &str = "MEDISCAN_SEVERITY";
const ARG_API_URL: &str = "--api-url";
const ARG_TIMEOUT: &str = "--timeout";

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "mediscan_portal=info"
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an absolute http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("Invalid severity entry {entry:?}: expected label=tier")]
    InvalidSeverity { entry: String },
}

/// Runtime configuration for the portal engines.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Extra or overriding classification label → tier entries.
    pub severity_overrides: Vec<(String, SeverityTier)>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            severity_overrides: Vec::new(),
        }
    }
}

impl PortalConfig {
    /// Build from `MEDISCAN_*` environment variables, defaults for the rest.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api_base_url = validate_base_url(ENV_API_URL, &url)?;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            config.request_timeout_secs = match raw.trim().parse::<u64>() {
                Ok(secs) => validate_timeout(ENV_TIMEOUT, secs)?,
                Err(_) => {
                    return Err(ConfigError::InvalidTimeout {
                        var: ENV_TIMEOUT,
                        value: raw,
                    })
                }
            };
        }

        if let Some(raw) = lookup(ENV_SEVERITY) {
            config.severity_overrides = parse_severity_overrides(&raw)?;
        }

        Ok(config)
    }

    /// Apply command-line overrides with the same checks as the environment.
    pub fn with_overrides(
        mut self,
        api_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = api_url {
            self.api_base_url = validate_base_url(ARG_API_URL, url)?;
        }
        if let Some(secs) = timeout_secs {
            self.request_timeout_secs = validate_timeout(ARG_TIMEOUT, secs)?;
        }
        Ok(self)
    }
}

fn validate_timeout(var: &'static str, secs: u64) -> Result<u64, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidTimeout {
            var,
            value: secs.to_string(),
        });
    }
    Ok(secs)
}

fn validate_base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    let has_host = trimmed.split("://").nth(1).is_some_and(|rest| !rest.is_empty());
    if has_scheme && has_host {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidUrl {
            var,
            value: raw.to_string(),
        })
    }
}

/// Parse `label=tier,label=tier`. Blank entries are skipped.
pub fn parse_severity_overrides(raw: &str) -> Result<Vec<(String, SeverityTier)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidSeverity {
                entry: entry.to_string(),
            };
            let (label, tier) = entry.split_once('=').ok_or_else(invalid)?;
            let label = label.trim();
            if label.is_empty() {
                return Err(invalid());
            }
            let tier = SeverityTier::from_str(tier.trim()).map_err(|_| invalid())?;
            Ok((label.to_string(), tier))
        })
        .collect()
}
