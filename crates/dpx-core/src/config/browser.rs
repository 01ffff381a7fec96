//! Browser configuration and console URL derivation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::tunnel::TerminationConfig;

/// Which generation of cluster web UIs to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleProfile {
    /// Namenode UI on 50070
    Hadoop2,
    /// Namenode UI on 9870
    #[default]
    Hadoop3,
}

impl ConsoleProfile {
    /// Default ports for this profile
    pub fn ports(self) -> ConsolePorts {
        match self {
            ConsoleProfile::Hadoop2 => ConsolePorts {
                resource_manager: 8088,
                namenode: 50070,
                job_history: 19888,
            },
            ConsoleProfile::Hadoop3 => ConsolePorts {
                resource_manager: 8088,
                namenode: 9870,
                job_history: 19888,
            },
        }
    }
}

impl FromStr for ConsoleProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hadoop2" => Ok(ConsoleProfile::Hadoop2),
            "hadoop3" => Ok(ConsoleProfile::Hadoop3),
            other => Err(format!(
                "unknown console profile '{}' (expected hadoop2 or hadoop3)",
                other
            )),
        }
    }
}

impl fmt::Display for ConsoleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleProfile::Hadoop2 => write!(f, "hadoop2"),
            ConsoleProfile::Hadoop3 => write!(f, "hadoop3"),
        }
    }
}

/// Ports of the management consoles on the master node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolePorts {
    pub resource_manager: u16,
    pub namenode: u16,
    pub job_history: u16,
}

impl ConsolePorts {
    /// Console URLs for a node, in opening order:
    /// resource manager, filesystem, job history.
    pub fn urls(&self, node: &str) -> Vec<String> {
        vec![
            format!("http://{}:{}", node, self.resource_manager),
            format!("http://{}:{}", node, self.namenode),
            format!("http://{}:{}/jobhistory/", node, self.job_history),
        ]
    }
}

/// Configuration for the browser subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser executable; discovered per platform when unset
    pub executable: Option<PathBuf>,

    /// Console port set
    pub console_profile: ConsoleProfile,

    /// Per-port overrides on top of the profile
    pub resource_manager_port: Option<u16>,
    pub namenode_port: Option<u16>,
    pub job_history_port: Option<u16>,

    /// Extra command-line switches passed before the URLs
    pub extra_args: Vec<String>,

    /// How the browser is stopped
    pub termination: TerminationConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            console_profile: ConsoleProfile::default(),
            resource_manager_port: None,
            namenode_port: None,
            job_history_port: None,
            extra_args: vec![],
            termination: TerminationConfig::default(),
        }
    }
}

impl BrowserConfig {
    /// Effective console ports: the profile, then any overrides
    pub fn console_ports(&self) -> ConsolePorts {
        let base = self.console_profile.ports();
        ConsolePorts {
            resource_manager: self.resource_manager_port.unwrap_or(base.resource_manager),
            namenode: self.namenode_port.unwrap_or(base.namenode),
            job_history: self.job_history_port.unwrap_or(base.job_history),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hadoop3_urls() {
        let urls = ConsoleProfile::Hadoop3.ports().urls("clusterA-m");
        assert_eq!(
            urls,
            vec![
                "http://clusterA-m:8088",
                "http://clusterA-m:9870",
                "http://clusterA-m:19888/jobhistory/",
            ]
        );
    }

    #[test]
    fn test_hadoop2_namenode_port() {
        assert_eq!(ConsoleProfile::Hadoop2.ports().namenode, 50070);
    }

    #[test]
    fn test_port_overrides() {
        let config = BrowserConfig {
            job_history_port: Some(19999),
            ..Default::default()
        };
        let ports = config.console_ports();
        assert_eq!(ports.resource_manager, 8088);
        assert_eq!(ports.job_history, 19999);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("Hadoop2".parse::<ConsoleProfile>(), Ok(ConsoleProfile::Hadoop2));
        assert!("hadoop4".parse::<ConsoleProfile>().is_err());
    }
}
