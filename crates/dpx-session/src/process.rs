//! Child process supervision
//!
//! Wraps a spawned child with a cached exit status and the graceful-then-
//! forced termination sequence shared by the tunnel and the browser.
//!
//! On Unix a child either shares our process group or leads a new one.
//! A child in its own group is signalled as a whole group, grandchildren
//! included, and never sees a terminal Ctrl+C. It is also a background job,
//! so anything in it that reads the terminal is stopped with SIGTTIN.
//! A child in our group can prompt on the terminal but only the child
//! itself is signalled.

use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use dpx_core::config::{ProcessGroup, TerminationConfig};
use dpx_core::{LaunchError, TerminationError};

/// How a stop request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process was already gone; nothing was sent
    AlreadyExited,
    /// The process exited after the graceful request
    Terminated,
    /// The process had to be force-killed
    Killed,
}

/// Result of delivering a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// No such process
    Gone,
}

/// A spawned child owned by exactly one manager
pub struct ManagedChild {
    label: &'static str,
    child: Child,
    pid: u32,
    group: ProcessGroup,
    exit_status: Option<ExitStatus>,
}

impl ManagedChild {
    /// Spawn `command` detached from our stdin, in the given process group
    pub fn spawn(
        label: &'static str,
        mut command: Command,
        group: ProcessGroup,
    ) -> Result<Self, LaunchError> {
        command.stdin(Stdio::null()).kill_on_drop(true);

        #[cfg(unix)]
        if group == ProcessGroup::Own {
            command.process_group(0);
        }

        let program = format!("{:?}", command.as_std().get_program());
        let child = command
            .spawn()
            .map_err(|source| LaunchError::Spawn { program, source })?;

        // id() is only None once the child has been reaped
        let pid = child.id().unwrap_or_default();
        tracing::debug!("Spawned {} (pid {}, {:?} process group)", label, pid, group);

        Ok(Self {
            label,
            child,
            pid,
            group,
            exit_status: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the process has exited, without blocking
    pub fn try_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit_status.is_none() {
            self.exit_status = self.child.try_wait()?;
        }
        Ok(self.exit_status)
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Ask the process to exit, then force it after the grace polls.
    ///
    /// Safe to call repeatedly; once the process is gone this returns
    /// `AlreadyExited`. A "no such process" race is not an error.
    pub async fn terminate(
        &mut self,
        policy: &TerminationConfig,
    ) -> Result<StopOutcome, TerminationError> {
        if self.try_exit().map_err(|e| self.error(e))?.is_some() {
            return Ok(StopOutcome::AlreadyExited);
        }

        tracing::debug!("Requesting {} (pid {}) to terminate", self.label, self.pid);
        if self.request_terminate().map_err(|e| self.error(e))? == Delivery::Gone {
            self.reap().await?;
            return Ok(StopOutcome::AlreadyExited);
        }

        for _ in 0..policy.grace_polls {
            tokio::time::sleep(policy.poll_interval).await;
            if self.try_exit().map_err(|e| self.error(e))?.is_some() {
                return Ok(StopOutcome::Terminated);
            }
        }

        tracing::warn!(
            "{} (pid {}) still running after {:?}, killing",
            self.label,
            self.pid,
            policy.grace_period()
        );
        self.force_kill().map_err(|e| self.error(e))?;
        self.reap().await?;
        Ok(StopOutcome::Killed)
    }

    async fn reap(&mut self) -> Result<(), TerminationError> {
        self.wait().await.map(|_| ()).map_err(|e| self.error(e))
    }

    #[cfg(unix)]
    fn request_terminate(&mut self) -> io::Result<Delivery> {
        self.signal(libc::SIGTERM)
    }

    /// No graceful request exists here, so the first step already kills
    #[cfg(not(unix))]
    fn request_terminate(&mut self) -> io::Result<Delivery> {
        self.force_kill()?;
        Ok(Delivery::Sent)
    }

    #[cfg(unix)]
    fn force_kill(&mut self) -> io::Result<()> {
        self.signal(libc::SIGKILL).map(|_| ())
    }

    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> io::Result<Delivery> {
        match self.group {
            ProcessGroup::Own => signal_group(self.pid, signal),
            ProcessGroup::Shared => send_signal(self.pid as libc::pid_t, signal),
        }
    }

    #[cfg(not(unix))]
    fn force_kill(&mut self) -> io::Result<()> {
        match self.child.start_kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    fn error(&self, source: io::Error) -> TerminationError {
        TerminationError {
            process: self.label.to_string(),
            pid: self.pid,
            source,
        }
    }
}

/// Signal the process group led by `pid`, falling back to the process
/// itself when the group is already gone.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<Delivery> {
    match send_signal(-(pid as libc::pid_t), signal)? {
        Delivery::Sent => Ok(Delivery::Sent),
        Delivery::Gone => send_signal(pid as libc::pid_t, signal),
    }
}

#[cfg(unix)]
fn send_signal(pid: libc::pid_t, signal: libc::c_int) -> io::Result<Delivery> {
    // SAFETY: kill(2) has no memory-safety preconditions
    let result = unsafe { libc::kill(pid, signal) };
    if result == 0 {
        return Ok(Delivery::Sent);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(Delivery::Gone)
    } else {
        Err(err)
    }
}
