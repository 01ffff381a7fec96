//! Tunnel configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, option_duration_secs};

/// How SSH options are handed to `gcloud compute ssh`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SshFlagStyle {
    /// Everything after `--` goes straight to ssh
    #[default]
    Separator,
    /// One `--ssh-flag=<opt>` per option
    SshFlag,
}

/// Process group a supervised child is started in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessGroup {
    /// Our own group, so the child can read the terminal and sees Ctrl+C
    #[default]
    Shared,
    /// A new group led by the child; signals reach its descendants too
    Own,
}

/// Configuration for the SOCKS tunnel subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// How SSH options are passed to gcloud
    pub ssh_flag_style: SshFlagStyle,

    /// SSH ConnectTimeout in seconds
    pub connect_timeout_secs: u32,

    /// Process group for gcloud and ssh. `shared` keeps them in the
    /// terminal's foreground group so ssh can prompt for a key passphrase.
    pub process_group: ProcessGroup,

    /// Additional raw SSH options appended after the built-in ones
    pub extra_ssh_options: Vec<String>,

    /// First port of the ephemeral range (inclusive)
    pub port_range_start: u16,

    /// End of the ephemeral range (exclusive)
    pub port_range_end: u16,

    /// How many random picks to try before giving up
    pub port_attempts: u32,

    /// Delay between readiness probes
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Upper bound on the readiness wait. Unbounded when absent.
    #[serde(default, with = "option_duration_secs")]
    pub ready_timeout: Option<Duration>,

    /// How the tunnel is stopped
    pub termination: TerminationConfig,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            ssh_flag_style: SshFlagStyle::default(),
            connect_timeout_secs: 5,
            process_group: ProcessGroup::default(),
            extra_ssh_options: vec![],
            port_range_start: 5000,
            port_range_end: 10000,
            port_attempts: 10,
            poll_interval: Duration::from_millis(100),
            ready_timeout: None,
            termination: TerminationConfig::default(),
        }
    }
}

/// Graceful-then-forced termination policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    /// Exit checks after the graceful request before forcing
    pub grace_polls: u32,

    /// Delay between exit checks
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            grace_polls: 10,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl TerminationConfig {
    /// Longest time a stop waits before forcing
    pub fn grace_period(&self) -> Duration {
        self.poll_interval * self.grace_polls
    }
}
