//! Session coordinator
//!
//! Drives one session from identifiers to a proxied browser and back:
//!
//! ```text
//! Idle → Resolving → Verifying → TunnelStarting → TunnelReady
//!      → BrowserStarting → BrowserRunning → Closing → Done
//! ```
//!
//! Every lookup is attempted once. The browser is only started after the
//! tunnel has been observed ready. Whatever handles exist are torn down in
//! `Closing`, browser first, on every path out of the session: normal
//! browser exit, failure or interrupt.
//!
//! Interrupts arrive through a [`CancellationToken`] that is raced against
//! each suspension point.

use std::future::Future;
use std::process::ExitStatus;

use tokio_util::sync::CancellationToken;

use dpx_core::error::Identifiers;
use dpx_core::traits::{BrowserProcess, ClusterLocator, ProcessLauncher, TunnelProcess};
use dpx_core::{
    ClusterSelector, SessionError, SessionPhase, SessionRequest, Target, TerminationError,
};

use crate::port::PortPicker;

/// Progress notifications for the user-facing layer
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'a> {
    /// Master node found and verified running
    Resolved(&'a Target),
    /// Tunnel process spawned on the given local port
    TunnelStarted { port: u16 },
    /// Tunnel accepted a probe connection
    TunnelReady { port: u16 },
    /// Browser process spawned
    BrowserStarted,
}

type Observer = Box<dyn Fn(&SessionEvent<'_>) + Send + Sync>;

/// How a session that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user closed the browser
    BrowserClosed(ExitStatus),
    /// An interrupt was received
    Interrupted,
}

/// Summary of a finished session
#[derive(Debug)]
pub struct SessionReport {
    /// Absent when interrupted before resolution finished
    pub target: Option<Target>,
    pub local_port: Option<u16>,
    pub end: SessionEnd,
    /// Stop failures collected during teardown
    pub teardown_errors: Vec<TerminationError>,
}

impl SessionReport {
    fn interrupted(target: Option<Target>) -> Self {
        Self {
            target,
            local_port: None,
            end: SessionEnd::Interrupted,
            teardown_errors: Vec::new(),
        }
    }

    /// Whether teardown stopped everything without error
    pub fn is_clean(&self) -> bool {
        self.teardown_errors.is_empty()
    }
}

/// The subprocess handles owned by one session
pub struct SessionHandles<T, B> {
    tunnel: Option<T>,
    browser: Option<B>,
}

impl<T, B> Default for SessionHandles<T, B> {
    fn default() -> Self {
        Self {
            tunnel: None,
            browser: None,
        }
    }
}

impl<T: TunnelProcess, B: BrowserProcess> SessionHandles<T, B> {
    pub fn new(tunnel: Option<T>, browser: Option<B>) -> Self {
        Self { tunnel, browser }
    }

    pub fn tunnel(&self) -> Option<&T> {
        self.tunnel.as_ref()
    }

    pub fn browser(&self) -> Option<&B> {
        self.browser.as_ref()
    }

    /// Stop the browser, then the tunnel.
    ///
    /// A failing stop never prevents the other. Handles are kept, so calling
    /// this again only repeats stops that have not yet succeeded.
    pub async fn teardown(&mut self) -> Vec<TerminationError> {
        let mut errors = Vec::new();

        if let Some(browser) = self.browser.as_mut() {
            if let Err(e) = browser.stop().await {
                tracing::warn!("Failed to stop browser: {}", e);
                errors.push(e);
            }
        }

        if let Some(tunnel) = self.tunnel.as_mut() {
            if let Err(e) = tunnel.stop().await {
                tracing::warn!("Failed to stop tunnel: {}", e);
                errors.push(e);
            }
        }

        errors
    }
}

/// Runs sessions against a locator and a process launcher
pub struct SessionCoordinator<L, P> {
    locator: L,
    launcher: P,
    ports: PortPicker,
    cancel: CancellationToken,
    phase: SessionPhase,
    observer: Option<Observer>,
}

impl<L, P> SessionCoordinator<L, P>
where
    L: ClusterLocator,
    P: ProcessLauncher,
{
    pub fn new(locator: L, launcher: P, ports: PortPicker, cancel: CancellationToken) -> Self {
        Self {
            locator,
            launcher,
            ports,
            cancel,
            phase: SessionPhase::Idle,
            observer: None,
        }
    }

    /// Receive progress events while the session runs
    pub fn with_observer(
        mut self,
        observer: impl Fn(&SessionEvent<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    pub fn launcher(&self) -> &P {
        &self.launcher
    }

    /// Run a session to completion.
    ///
    /// Returns a report when the browser was closed or the session was
    /// interrupted; teardown failures are in the report. Fatal errors are
    /// returned after teardown has run.
    pub async fn run(&mut self, request: &SessionRequest) -> Result<SessionReport, SessionError> {
        let result = self.run_session(request).await;
        self.enter(SessionPhase::Done);
        result
    }

    async fn run_session(&mut self, request: &SessionRequest) -> Result<SessionReport, SessionError> {
        let cancel = self.cancel.clone();

        self.enter(SessionPhase::Resolving);
        let target = match until_cancelled(&cancel, self.resolve(request)).await {
            Some(target) => target?,
            None => return Ok(self.interrupted_before_tunnel(None)),
        };

        self.enter(SessionPhase::Verifying);
        match until_cancelled(&cancel, self.verify(request, &target)).await {
            Some(verified) => verified?,
            None => return Ok(self.interrupted_before_tunnel(Some(target))),
        }
        self.notify(&SessionEvent::Resolved(&target));

        self.enter(SessionPhase::TunnelStarting);
        if cancel.is_cancelled() {
            return Ok(self.interrupted_before_tunnel(Some(target)));
        }
        let port = self.ports.pick()?;

        let mut handles = SessionHandles::default();
        let result = self
            .connect(&target, port, &request.extra_uris, &mut handles)
            .await;

        self.enter(SessionPhase::Closing);
        let teardown_errors = handles.teardown().await;

        match result {
            Ok(end) => Ok(SessionReport {
                target: Some(target),
                local_port: Some(port),
                end,
                teardown_errors,
            }),
            Err(e) => {
                if !teardown_errors.is_empty() {
                    tracing::warn!(
                        "{} process(es) could not be stopped after failure",
                        teardown_errors.len()
                    );
                }
                Err(e)
            }
        }
    }

    /// Find the master node for the request
    async fn resolve(&self, request: &SessionRequest) -> Result<Target, SessionError> {
        let cluster = match &request.selector {
            ClusterSelector::Cluster(cluster) => cluster.clone(),
            ClusterSelector::Job(job) => {
                tracing::info!("Looking up cluster for job {}", job);
                self.locator
                    .resolve_by_job(&request.project, &request.region, job)
                    .await
                    .map_err(|source| SessionError::Resolution {
                        ids: Identifiers::for_request(request, None),
                        source,
                    })?
            }
        };

        tracing::info!("Looking up master node of cluster {}", cluster);
        let location = self
            .locator
            .resolve_by_cluster(&request.project, &request.region, &cluster)
            .await
            .map_err(|source| SessionError::Resolution {
                ids: Identifiers::for_request(request, Some(&cluster)),
                source,
            })?;

        Ok(Target::resolved(request, cluster, location))
    }

    /// Require the master node to be RUNNING
    async fn verify(&self, request: &SessionRequest, target: &Target) -> Result<(), SessionError> {
        let status = self
            .locator
            .node_status(&target.project, &target.zone, &target.node)
            .await
            .map_err(|source| SessionError::Resolution {
                ids: Identifiers::for_request(request, Some(&target.cluster)),
                source,
            })?;

        if !status.is_running() {
            return Err(SessionError::NodeNotRunning {
                node: target.node.clone(),
                zone: target.zone.clone(),
                status: status.to_string(),
                ids: Identifiers::for_request(request, Some(&target.cluster)),
            });
        }

        tracing::info!("Master node {} is {}", target, status);
        Ok(())
    }

    /// Start the tunnel, then the browser, then wait for the browser
    async fn connect(
        &mut self,
        target: &Target,
        port: u16,
        extra_uris: &[String],
        handles: &mut SessionHandles<P::Tunnel, P::Browser>,
    ) -> Result<SessionEnd, SessionError> {
        let cancel = self.cancel.clone();

        let tunnel = handles
            .tunnel
            .insert(self.launcher.start_tunnel(target, port)?);
        self.notify(&SessionEvent::TunnelStarted { port });

        match until_cancelled(&cancel, tunnel.wait_ready()).await {
            None => return Ok(SessionEnd::Interrupted),
            // A terminal Ctrl+C reaches a tunnel in our process group too
            Some(Err(_)) if cancel.is_cancelled() => return Ok(SessionEnd::Interrupted),
            Some(Err(source)) => {
                return Err(SessionError::TunnelUnavailable {
                    node: target.node.clone(),
                    ids: Identifiers::from(target),
                    source,
                })
            }
            Some(Ok(())) => {}
        }
        self.enter(SessionPhase::TunnelReady);
        self.notify(&SessionEvent::TunnelReady { port });

        self.enter(SessionPhase::BrowserStarting);
        let browser = handles
            .browser
            .insert(self.launcher.start_browser(target, port, extra_uris)?);
        self.enter(SessionPhase::BrowserRunning);
        self.notify(&SessionEvent::BrowserStarted);

        match until_cancelled(&cancel, browser.wait_exit()).await {
            None => Ok(SessionEnd::Interrupted),
            Some(Ok(status)) => Ok(SessionEnd::BrowserClosed(status)),
            Some(Err(e)) => Err(SessionError::BrowserWait(e)),
        }
    }

    fn interrupted_before_tunnel(&self, target: Option<Target>) -> SessionReport {
        tracing::info!("Interrupted during {}, nothing to tear down", self.phase);
        SessionReport::interrupted(target)
    }

    fn enter(&mut self, phase: SessionPhase) {
        tracing::debug!("Session {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn notify(&self, event: &SessionEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}

/// Await `fut` unless `cancel` fires first. A token that is already
/// cancelled wins without polling `fut`.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}
