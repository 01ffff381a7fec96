//! Subprocess traits used by the session coordinator

use std::process::ExitStatus;

use async_trait::async_trait;

use crate::error::{LaunchError, TerminationError, TunnelError};
use crate::types::{BrowserState, Target, TunnelState};

/// A running tunnel subprocess
#[async_trait]
pub trait TunnelProcess: Send {
    /// Local port the tunnel listens on
    fn local_port(&self) -> u16;

    /// Current liveness state
    fn state(&self) -> TunnelState;

    /// Wait until the local port accepts a connection while the process
    /// is alive. Fails if the process exits first.
    async fn wait_ready(&mut self) -> Result<(), TunnelError>;

    /// Stop the process. A no-op when it is already gone.
    async fn stop(&mut self) -> Result<(), TerminationError>;
}

/// A running browser subprocess
#[async_trait]
pub trait BrowserProcess: Send {
    /// Current liveness state
    fn state(&self) -> BrowserState;

    /// Wait for the browser to exit on its own
    async fn wait_exit(&mut self) -> std::io::Result<ExitStatus>;

    /// Stop the process. A no-op when it is already gone.
    async fn stop(&mut self) -> Result<(), TerminationError>;
}

/// Spawns the session's subprocesses
pub trait ProcessLauncher: Send + Sync {
    type Tunnel: TunnelProcess;
    type Browser: BrowserProcess;

    /// Spawn the tunnel without waiting for it to come up
    fn start_tunnel(&self, target: &Target, local_port: u16) -> Result<Self::Tunnel, LaunchError>;

    /// Spawn the browser pointed through the tunnel on `local_port`
    fn start_browser(
        &self,
        target: &Target,
        local_port: u16,
        extra_uris: &[String],
    ) -> Result<Self::Browser, LaunchError>;
}
