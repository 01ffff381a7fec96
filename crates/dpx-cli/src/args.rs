//! Command-line arguments

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use dpx_core::config::{ConsoleProfile, DpxConfig};
use dpx_core::{ClusterSelector, SessionError, SessionRequest};

#[derive(Parser, Debug)]
#[command(name = "dpx")]
#[command(
    author,
    version,
    about = "Open Dataproc cluster web consoles through an SSH SOCKS tunnel"
)]
#[command(group(ArgGroup::new("selector").required(true).args(["job", "cluster"])))]
pub struct Cli {
    /// Google Cloud project ID
    #[arg(long)]
    pub project: String,

    /// Dataproc job ID; the cluster that ran it is used
    #[arg(long)]
    pub job: Option<String>,

    /// Dataproc cluster name
    #[arg(long)]
    pub cluster: Option<String>,

    /// Dataproc region [default: global]
    #[arg(long)]
    pub region: Option<String>,

    /// Additional URLs to open through the tunnel
    #[arg(value_name = "URIS")]
    pub uris: Vec<String>,

    /// Local SOCKS port (random by default)
    #[arg(long)]
    pub port: Option<u16>,

    /// Give up if the tunnel is not ready after this many seconds
    #[arg(long, value_name = "SECS")]
    pub ready_timeout: Option<u64>,

    /// Browser executable (Chrome or Chromium)
    #[arg(long, value_name = "PATH")]
    pub browser: Option<PathBuf>,

    /// Console port layout: hadoop2 or hadoop3
    #[arg(long, value_name = "PROFILE")]
    pub console_profile: Option<ConsoleProfile>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        }
    }

    /// Apply command-line settings on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut DpxConfig) {
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(secs) = self.ready_timeout {
            config.tunnel.ready_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(browser) = &self.browser {
            config.browser.executable = Some(browser.clone());
        }
        if let Some(profile) = self.console_profile {
            config.browser.console_profile = profile;
        }
    }

    /// The session described by these arguments
    pub fn session_request(&self, config: &DpxConfig) -> Result<SessionRequest, SessionError> {
        let selector = ClusterSelector::from_args(self.job.clone(), self.cluster.clone())?;
        Ok(SessionRequest {
            project: self.project.clone(),
            region: config.region.clone(),
            selector,
            extra_uris: self.uris.clone(),
        })
    }
}
