//! Client configuration.
//!
//! Defaults target a gateway on localhost. Environment variables override
//! individual fields:
//!
//! | Variable | Field | Format |
//! |---|---|---|
//! | `KYBERLINK_GATEWAY_URL` | `gateway_url` | base URL, no trailing path |
//! | `KYBERLINK_TIMEOUT_SECS` | `timeout` | whole seconds, > 0 |

use std::time::Duration;

use thiserror::Error;

/// Gateway used when nothing else is configured.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:45782";

/// Per-request transport timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding [`ClientConfig::gateway_url`].
pub const GATEWAY_URL_VAR: &str = "KYBERLINK_GATEWAY_URL";

/// Environment variable overriding [`ClientConfig::timeout`].
pub const TIMEOUT_SECS_VAR: &str = "KYBERLINK_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Timeout is not a positive integer number of seconds
    #[error("invalid timeout '{0}': expected whole seconds greater than zero")]
    InvalidTimeout(String),

    /// Gateway URL is empty or not http(s)
    #[error("invalid gateway url '{0}'")]
    InvalidGatewayUrl(String),
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the gateway
    pub gateway_url: String,
    /// Transport timeout for each request
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { gateway_url: DEFAULT_GATEWAY_URL.to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

impl ClientConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(GATEWAY_URL_VAR) {
            config.gateway_url = url;
        }
        if let Some(secs) = lookup(TIMEOUT_SECS_VAR) {
            config.timeout = parse_timeout(&secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Replace the gateway URL.
    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Replace the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.gateway_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidGatewayUrl(self.gateway_url.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(format!("{}s", self.timeout.as_secs())));
        }
        Ok(())
    }

    /// Gateway URL without trailing slashes, ready for path joins
    pub fn base_url(&self) -> &str {
        self.gateway_url.trim_end_matches('/')
    }
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(value.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.gateway_url, "http://localhost:45782");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        assert_eq!(ClientConfig::from_lookup(lookup(&[])).unwrap(), ClientConfig::default());
    }

    #[test]
    fn environment_overrides_fields() {
        let config = ClientConfig::from_lookup(lookup(&[
            (GATEWAY_URL_VAR, "https://gateway.example:8443/"),
            (TIMEOUT_SECS_VAR, " 5 "),
        ]))
        .unwrap();

        assert_eq!(config.gateway_url, "https://gateway.example:8443/");
        assert_eq!(config.base_url(), "https://gateway.example:8443");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        for bad in ["0", "-1", "soon", ""] {
            assert_eq!(
                ClientConfig::from_lookup(lookup(&[(TIMEOUT_SECS_VAR, bad)])),
                Err(ConfigError::InvalidTimeout(bad.to_string()))
            );
        }
    }

    #[test]
    fn non_http_gateway_is_rejected() {
        let result = ClientConfig::from_lookup(lookup(&[(GATEWAY_URL_VAR, "ftp://gateway")]));
        assert!(matches!(result, Err(ConfigError::InvalidGatewayUrl(_))));
    }

    #[test]
    fn builders_replace_fields() {
        let config = ClientConfig::default()
            .with_gateway_url("http://127.0.0.1:9000")
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
