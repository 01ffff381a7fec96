//! Configuration management for dpx

mod browser;
mod dpx;
pub mod serde_utils;
mod tunnel;

pub use browser::{BrowserConfig, ConsolePorts, ConsoleProfile};
pub use dpx::{ApiConfig, DpxConfig};
pub use tunnel::{ProcessGroup, SshFlagStyle, TerminationConfig, TunnelConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dpx")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load the config from an explicit path, or fall back to the default one.
///
/// An explicit path must exist. The default path is optional and a broken
/// default file only produces a warning.
pub fn load_or_default(explicit: Option<&Path>) -> Result<DpxConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    let default_path = default_config_path();
    if !default_path.exists() {
        tracing::debug!("No config at {:?}, using defaults", default_path);
        return Ok(DpxConfig::default());
    }

    Ok(load_config(&default_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
        DpxConfig::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        match load_or_default(Some(&path)) {
            Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
region = "europe-west1"

[tunnel]
ssh_flag_style = "ssh-flag"
ready_timeout = 20

[browser]
console_profile = "hadoop2"
"#,
        )
        .unwrap();

        let config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config.region, "europe-west1");
        assert_eq!(config.tunnel.ssh_flag_style, SshFlagStyle::SshFlag);
        assert_eq!(
            config.tunnel.ready_timeout,
            Some(std::time::Duration::from_secs(20))
        );
        assert_eq!(config.tunnel.port_range_start, 5000);
        assert_eq!(config.browser.console_ports().namenode, 50070);
        assert_eq!(config.api.auth_attempts, 5);
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "region = [").unwrap();
        assert!(matches!(
            load_or_default(Some(&path)),
            Err(ConfigError::Parse(_))
        ));
    }
}
