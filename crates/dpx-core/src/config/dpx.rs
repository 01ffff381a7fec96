//! Top-level dpx configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::{BrowserConfig, TunnelConfig};
use crate::types::DEFAULT_REGION;

/// Configuration file root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DpxConfig {
    /// Region used when `--region` is not given
    pub region: String,

    /// gcloud executable used for the tunnel and for credentials
    pub gcloud: String,

    pub tunnel: TunnelConfig,

    pub browser: BrowserConfig,

    pub api: ApiConfig,
}

impl Default for DpxConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            gcloud: "gcloud".to_string(),
            tunnel: TunnelConfig::default(),
            browser: BrowserConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Cloud API endpoints and credential policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Dataproc API base URL
    pub dataproc_endpoint: String,

    /// Compute Engine API base URL
    pub compute_endpoint: String,

    /// Interactive login attempts before giving up
    pub auth_attempts: u32,

    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            dataproc_endpoint: "https://dataproc.googleapis.com".to_string(),
            compute_endpoint: "https://compute.googleapis.com".to_string(),
            auth_attempts: 5,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config: DpxConfig = toml::from_str("").unwrap();
        assert_eq!(config.region, "global");
        assert_eq!(config.gcloud, "gcloud");
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
        assert!(config.browser.executable.is_none());
    }

    #[test]
    fn test_defaults_round_trip() {
        let text = toml::to_string(&DpxConfig::default()).unwrap();
        let config: DpxConfig = toml::from_str(&text).unwrap();

        assert_eq!(config.region, "global");
        assert_eq!(config.tunnel.poll_interval, Duration::from_millis(100));
        assert!(config.tunnel.ready_timeout.is_none());
        assert_eq!(config.tunnel.termination.grace_polls, 10);
        assert_eq!(config.browser.console_ports().namenode, 9870);
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_endpoints_override() {
        let config: DpxConfig = toml::from_str(
            r#"
[api]
dataproc_endpoint = "http://127.0.0.1:9000"
auth_attempts = 2
"#,
        )
        .unwrap();
        assert_eq!(config.api.dataproc_endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.api.compute_endpoint, "https://compute.googleapis.com");
        assert_eq!(config.api.auth_attempts, 2);
    }
}
