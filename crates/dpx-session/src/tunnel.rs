//! SOCKS tunnel over `gcloud compute ssh`
//!
//! The tunnel is an `ssh -D` dynamic forward on 127.0.0.1, started through
//! gcloud so that key distribution and IAP are handled for us. It is ready
//! once the local port accepts a connection while the process is still
//! alive.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::Instant;

use dpx_core::config::{SshFlagStyle, TerminationConfig, TunnelConfig};
use dpx_core::traits::TunnelProcess;
use dpx_core::{LaunchError, Target, TerminationError, TunnelError, TunnelState};

use crate::process::{ManagedChild, StopOutcome};

/// Upper bound on a single readiness probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// SSH options for a dynamic forward on `port`, one option per entry.
///
/// Options that take a value are kept together (`-o ConnectTimeout=5`) so
/// they can be passed as a single `--ssh-flag`.
pub fn ssh_options(port: u16, config: &TunnelConfig) -> Vec<String> {
    let mut options = vec![
        "-x".to_string(),
        format!("-o ConnectTimeout={}", config.connect_timeout_secs),
        "-o ExitOnForwardFailure=yes".to_string(),
        format!("-D 127.0.0.1:{}", port),
        "-n".to_string(),
        "-N".to_string(),
    ];
    options.extend(config.extra_ssh_options.iter().cloned());
    options
}

/// Arguments for `gcloud` that open the tunnel to `target`
pub fn tunnel_args(target: &Target, port: u16, config: &TunnelConfig) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-q".into(),
        "compute".into(),
        "ssh".into(),
        target.node.clone(),
        "--project".into(),
        target.project.clone(),
        "--zone".into(),
        target.zone.clone(),
    ];

    let options = ssh_options(port, config);
    match config.ssh_flag_style {
        SshFlagStyle::Separator => {
            args.push("--".into());
            args.extend(
                options
                    .iter()
                    .flat_map(|opt| opt.split_whitespace())
                    .map(str::to_string),
            );
        }
        SshFlagStyle::SshFlag => {
            args.extend(options.iter().map(|opt| format!("--ssh-flag={}", opt)));
        }
    }

    args
}

/// A tunnel subprocess and its readiness state
pub struct SshTunnel {
    child: ManagedChild,
    port: u16,
    state: TunnelState,
    poll_interval: Duration,
    ready_timeout: Option<Duration>,
    termination: TerminationConfig,
}

impl SshTunnel {
    /// Start `gcloud compute ssh` to the target node
    pub fn start(
        gcloud: &str,
        target: &Target,
        port: u16,
        config: &TunnelConfig,
    ) -> Result<Self, LaunchError> {
        let args = tunnel_args(target, port, config);
        tracing::info!("Executing: {} {}", gcloud, args.join(" "));

        let mut command = Command::new(gcloud);
        command.args(&args);
        Self::spawn(command, port, config)
    }

    /// Spawn an arbitrary command expected to listen on `port`
    pub fn spawn(command: Command, port: u16, config: &TunnelConfig) -> Result<Self, LaunchError> {
        let child = ManagedChild::spawn("tunnel", command, config.process_group)?;
        Ok(Self {
            child,
            port,
            state: TunnelState::Starting,
            poll_interval: config.poll_interval,
            ready_timeout: config.ready_timeout,
            termination: config.termination,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.pid()
    }

    fn exited(&mut self, status: std::process::ExitStatus) -> TunnelError {
        self.state = TunnelState::Exited;
        tracing::warn!("Tunnel process exited with {}", status);
        TunnelError::Exited {
            port: self.port,
            status: status.to_string(),
        }
    }

    async fn probe(&self) -> bool {
        match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(("127.0.0.1", self.port)))
            .await
        {
            Ok(Ok(mut stream)) => {
                let _ = stream.shutdown().await;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TunnelProcess for SshTunnel {
    fn local_port(&self) -> u16 {
        self.port
    }

    fn state(&self) -> TunnelState {
        self.state
    }

    async fn wait_ready(&mut self) -> Result<(), TunnelError> {
        match self.state {
            TunnelState::Ready => return Ok(()),
            TunnelState::Exited | TunnelState::Stopped => {
                return Err(TunnelError::Exited {
                    port: self.port,
                    status: self.state.to_string(),
                })
            }
            TunnelState::NotStarted | TunnelState::Starting => {}
        }

        tracing::info!("Waiting for tunnel on 127.0.0.1:{}", self.port);
        let started = Instant::now();
        loop {
            if let Some(status) = self.child.try_exit()? {
                return Err(self.exited(status));
            }

            if self.probe().await {
                // The port may belong to someone else if we died meanwhile
                if let Some(status) = self.child.try_exit()? {
                    return Err(self.exited(status));
                }
                self.state = TunnelState::Ready;
                tracing::info!(
                    "Tunnel ready on 127.0.0.1:{} after {:?}",
                    self.port,
                    started.elapsed()
                );
                return Ok(());
            }

            if let Some(limit) = self.ready_timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(TunnelError::Timeout {
                        port: self.port,
                        waited,
                    });
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn stop(&mut self) -> Result<(), TerminationError> {
        if !self.state.is_live() {
            return Ok(());
        }

        tracing::info!("Stopping tunnel (pid {})", self.child.pid());
        self.state = match self.child.terminate(&self.termination).await? {
            StopOutcome::AlreadyExited => TunnelState::Exited,
            StopOutcome::Terminated | StopOutcome::Killed => TunnelState::Stopped,
        };
        Ok(())
    }
}
