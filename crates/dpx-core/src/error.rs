//! Core error types for dpx

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::{ClusterSelector, SessionRequest, Target};

/// Top-level error for a proxy session.
///
/// Every variant is fatal to the session. The coordinator tears down
/// whatever subprocesses exist before returning one of these.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Missing or conflicting identifiers
    #[error("{0}")]
    Usage(String),

    /// Credential acquisition failed
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// Job, cluster or node lookup failed
    #[error("Failed to resolve cluster: {source}\n{ids}")]
    Resolution {
        ids: Identifiers,
        #[source]
        source: LocatorError,
    },

    /// Master node reported a status other than RUNNING
    #[error("Master node {node} in zone {zone} is {status}, unable to connect\n{ids}")]
    NodeNotRunning {
        node: String,
        zone: String,
        status: String,
        ids: Identifiers,
    },

    /// No free local port could be found for the tunnel
    #[error("No free local port in {start}..{end} after {attempts} attempts")]
    NoFreePort { start: u16, end: u16, attempts: u32 },

    /// Tunnel never became reachable
    #[error("Unable to connect to master node {node}: {source}\n{ids}")]
    TunnelUnavailable {
        node: String,
        ids: Identifiers,
        #[source]
        source: TunnelError,
    },

    /// A subprocess could not be launched
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Lost track of the running browser
    #[error("Failed to wait for browser: {0}")]
    BrowserWait(#[source] std::io::Error),
}

/// The identifiers in play for a session, rendered for operators.
///
/// Absent identifiers are shown as `[NOT SPECIFIED]` so a typo in the
/// other one is easy to spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifiers {
    pub project: String,
    pub region: String,
    pub cluster: Option<String>,
    pub job: Option<String>,
}

impl Identifiers {
    /// Identifiers for a request, with the cluster name once known
    pub fn for_request(request: &SessionRequest, cluster: Option<&str>) -> Self {
        let (job, requested_cluster) = match &request.selector {
            ClusterSelector::Job(job) => (Some(job.clone()), None),
            ClusterSelector::Cluster(cluster) => (None, Some(cluster.clone())),
        };
        Self {
            project: request.project.clone(),
            region: request.region.clone(),
            cluster: requested_cluster.or_else(|| cluster.map(str::to_string)),
            job,
        }
    }
}

impl From<&Target> for Identifiers {
    fn from(target: &Target) -> Self {
        Self {
            project: target.project.clone(),
            region: target.region.clone(),
            cluster: Some(target.cluster.clone()),
            job: target.job.clone(),
        }
    }
}

impl fmt::Display for Identifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNSET: &str = "[NOT SPECIFIED]";
        writeln!(f, " * project      : {}", self.project)?;
        writeln!(f, " * region       : {}", self.region)?;
        writeln!(
            f,
            " * cluster name : {}",
            self.cluster.as_deref().unwrap_or(UNSET)
        )?;
        write!(f, " * job ID       : {}", self.job.as_deref().unwrap_or(UNSET))
    }
}

/// Cluster locator errors
#[derive(Error, Debug)]
pub enum LocatorError {
    /// The job, cluster or instance does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The API call failed (network error or non-success status)
    #[error("API error: {0}")]
    Transport(String),

    /// The API answered but the payload lacked a required field
    #[error("Malformed API response: missing {0}")]
    MissingField(&'static str),
}

/// Credential acquisition errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Every login attempt was used up
    #[error("unable to obtain credentials after {attempts} login attempts")]
    Exhausted { attempts: u32 },

    /// The interactive login flow reported failure
    #[error("unable to authenticate: {0}")]
    LoginFailed(String),

    /// The gcloud tool could not be run
    #[error("failed to run {program}: {source}")]
    Gcloud {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tunnel readiness errors
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The tunnel process exited before its port accepted connections
    #[error("tunnel process exited before 127.0.0.1:{port} became reachable ({status})")]
    Exited { port: u16, status: String },

    /// The optional readiness bound elapsed
    #[error("tunnel on 127.0.0.1:{port} not ready after {waited:?}")]
    Timeout { port: u16, waited: Duration },

    /// Checking the tunnel process failed
    #[error("failed to check tunnel process: {0}")]
    Io(#[from] std::io::Error),
}

/// Subprocess launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The program could not be spawned
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Browser discovery found nothing
    #[error("no Chrome or Chromium executable found; set browser.executable or pass --browser")]
    BrowserNotFound,

    /// Creating the scratch profile directory failed
    #[error("failed to create browser profile directory: {0}")]
    ProfileDir(#[source] std::io::Error),
}

/// A stop request failed for a reason other than the process being gone
#[derive(Error, Debug)]
#[error("failed to stop {process} (pid {pid}): {source}")]
pub struct TerminationError {
    pub process: String,
    pub pid: u32,
    #[source]
    pub source: std::io::Error,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SessionError {
    /// Whether the error stems from how the tool was invoked
    pub fn is_usage(&self) -> bool {
        matches!(self, SessionError::Usage(_))
    }
}
