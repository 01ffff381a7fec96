//! Real subprocess launcher

use std::path::{Path, PathBuf};

use dpx_core::config::{BrowserConfig, DpxConfig, TunnelConfig};
use dpx_core::traits::ProcessLauncher;
use dpx_core::{LaunchError, Target};

use crate::browser::{find_browser_executable, ChromeBrowser};
use crate::tunnel::SshTunnel;

/// Launches `gcloud compute ssh` tunnels and Chrome
pub struct SystemLauncher {
    gcloud: String,
    browser_executable: PathBuf,
    tunnel: TunnelConfig,
    browser: BrowserConfig,
}

impl SystemLauncher {
    /// Build a launcher from configuration.
    ///
    /// The browser executable is resolved here so a missing browser is
    /// reported before any tunnel is opened.
    pub fn from_config(config: &DpxConfig) -> Result<Self, LaunchError> {
        let browser_executable = match &config.browser.executable {
            Some(path) => path.clone(),
            None => find_browser_executable().ok_or(LaunchError::BrowserNotFound)?,
        };
        tracing::debug!("Using browser {}", browser_executable.display());

        Ok(Self {
            gcloud: config.gcloud.clone(),
            browser_executable,
            tunnel: config.tunnel.clone(),
            browser: config.browser.clone(),
        })
    }

    pub fn browser_executable(&self) -> &Path {
        &self.browser_executable
    }
}

impl ProcessLauncher for SystemLauncher {
    type Tunnel = SshTunnel;
    type Browser = ChromeBrowser;

    fn start_tunnel(&self, target: &Target, local_port: u16) -> Result<SshTunnel, LaunchError> {
        SshTunnel::start(&self.gcloud, target, local_port, &self.tunnel)
    }

    fn start_browser(
        &self,
        target: &Target,
        local_port: u16,
        extra_uris: &[String],
    ) -> Result<ChromeBrowser, LaunchError> {
        ChromeBrowser::start(
            &self.browser_executable,
            target,
            local_port,
            extra_uris,
            &self.browser,
        )
    }
}
