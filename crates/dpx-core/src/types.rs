//! Core domain types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Region queried when none is given
pub const DEFAULT_REGION: &str = "global";

/// How the caller identifies the cluster to connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterSelector {
    /// A job id, resolved to the cluster it ran on
    Job(String),
    /// A cluster name
    Cluster(String),
}

impl ClusterSelector {
    /// Build a selector from optional job and cluster arguments.
    ///
    /// Exactly one of the two must be present.
    pub fn from_args(job: Option<String>, cluster: Option<String>) -> Result<Self, SessionError> {
        match (job, cluster) {
            (Some(job), None) => Ok(ClusterSelector::Job(job)),
            (None, Some(cluster)) => Ok(ClusterSelector::Cluster(cluster)),
            (None, None) => Err(SessionError::Usage(
                "Either a job ID or a cluster name needs to be specified".to_string(),
            )),
            (Some(_), Some(_)) => Err(SessionError::Usage(
                "Specify either a job ID or a cluster name, not both".to_string(),
            )),
        }
    }
}

/// Everything the caller supplies for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub project: String,
    pub region: String,
    pub selector: ClusterSelector,
    /// Extra URIs opened after the console pages
    pub extra_uris: Vec<String>,
}

/// Master node address as reported by the cluster API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLocation {
    pub hostname: String,
    pub zone: String,
}

/// The resolved node a session connects to. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub project: String,
    pub region: String,
    /// Cluster the node belongs to
    pub cluster: String,
    /// Job the cluster was discovered from, if any
    pub job: Option<String>,
    pub node: String,
    pub zone: String,
}

impl Target {
    /// Combine a request with its resolved cluster and node location
    pub fn resolved(request: &SessionRequest, cluster: String, location: NodeLocation) -> Self {
        let job = match &request.selector {
            ClusterSelector::Job(job) => Some(job.clone()),
            ClusterSelector::Cluster(_) => None,
        };
        Self {
            project: request.project.clone(),
            region: request.region.clone(),
            cluster,
            job,
            node: location.hostname,
            zone: location.zone,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.node, self.project, self.zone)
    }
}

/// Instance run status reported by the compute API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus(pub String);

impl NodeStatus {
    /// The only status a session accepts
    pub const RUNNING: &'static str = "RUNNING";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn is_running(&self) -> bool {
        self.0 == Self::RUNNING
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness of a tunnel subprocess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    NotStarted,
    /// Spawned, port not yet reachable
    Starting,
    /// Port accepted a probe connection while the process was alive
    Ready,
    /// Process exited on its own
    Exited,
    /// Process was stopped by us
    Stopped,
}

impl TunnelState {
    /// Whether a stop request still has something to do
    pub fn is_live(self) -> bool {
        matches!(self, TunnelState::Starting | TunnelState::Ready)
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelState::NotStarted => write!(f, "not-started"),
            TunnelState::Starting => write!(f, "starting"),
            TunnelState::Ready => write!(f, "ready"),
            TunnelState::Exited => write!(f, "exited"),
            TunnelState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Liveness of a browser subprocess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserState {
    NotStarted,
    Running,
    Exited,
    Stopped,
}

impl BrowserState {
    pub fn is_live(self) -> bool {
        self == BrowserState::Running
    }
}

impl fmt::Display for BrowserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserState::NotStarted => write!(f, "not-started"),
            BrowserState::Running => write!(f, "running"),
            BrowserState::Exited => write!(f, "exited"),
            BrowserState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Resolving,
    Verifying,
    TunnelStarting,
    TunnelReady,
    BrowserStarting,
    BrowserRunning,
    Closing,
    Done,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Resolving => "resolving",
            SessionPhase::Verifying => "verifying",
            SessionPhase::TunnelStarting => "tunnel-starting",
            SessionPhase::TunnelReady => "tunnel-ready",
            SessionPhase::BrowserStarting => "browser-starting",
            SessionPhase::BrowserRunning => "browser-running",
            SessionPhase::Closing => "closing",
            SessionPhase::Done => "done",
        };
        write!(f, "{}", name)
    }
}
