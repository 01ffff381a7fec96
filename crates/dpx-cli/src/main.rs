//! dpx CLI
//!
//! Resolves the master node of a Dataproc cluster, opens a SOCKS tunnel to
//! it with `gcloud compute ssh`, and launches a browser through the tunnel.
//! Both processes are stopped when the browser closes or on Ctrl+C.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dpx::args::Cli;
use dpx::exit;
use dpx::output::{format_consoles, print_error, print_info, print_success, print_warning};
use dpx_cloud::{credentials_file_notice, GcloudCredentials, RestLocator};
use dpx_core::config;
use dpx_core::SessionError;
use dpx_session::{PortPicker, SessionCoordinator, SessionEnd, SessionEvent, SystemLauncher};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level().into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::from(exit::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config =
        config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    let request = match cli.session_request(&config) {
        Ok(request) => request,
        Err(e) => return Ok(fail(&e)),
    };

    if let Some(notice) = credentials_file_notice() {
        print_info(&notice);
    }

    // Find the browser before anything is started
    let launcher = match SystemLauncher::from_config(&config) {
        Ok(launcher) => launcher,
        Err(e) => return Ok(fail(&e.into())),
    };

    let credentials = GcloudCredentials::new(config.gcloud.clone(), config.api.auth_attempts);
    let token = match credentials.access_token().await {
        Ok(token) => token,
        Err(e) => return Ok(fail(&e.into())),
    };
    let locator = RestLocator::new(&config.api, token).context("Failed to create API client")?;

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let ports = PortPicker::from_config(&config.tunnel).with_override(cli.port);
    let console_ports = config.browser.console_ports();
    let extra_uris = request.extra_uris.clone();

    let mut coordinator = SessionCoordinator::new(locator, launcher, ports, cancel)
        .with_observer(move |event| match event {
            SessionEvent::Resolved(target) => {
                print_success(&format!("Master node {} is running", target));
                println!("{}", format_consoles(target, &console_ports, &extra_uris));
            }
            SessionEvent::TunnelStarted { port } => {
                print_info(&format!("Starting SSH tunnel on 127.0.0.1:{}", port));
            }
            SessionEvent::TunnelReady { .. } => {
                print_success("Proxy connected via ssh, starting browser");
            }
            SessionEvent::BrowserStarted => {
                print_info("Close the browser window or press Ctrl+C to end the session");
            }
        });

    match coordinator.run(&request).await {
        Ok(report) => {
            for e in &report.teardown_errors {
                print_error(&e.to_string());
            }
            match report.end {
                SessionEnd::BrowserClosed(status) => {
                    tracing::debug!("Browser exited with {}", status);
                    print_success("Browser closed, tunnel stopped");
                }
                SessionEnd::Interrupted => print_warning("Interrupted, session closed"),
            }
            Ok(exit::for_report(&report))
        }
        Err(e) => Ok(fail(&e)),
    }
}

fn fail(error: &SessionError) -> u8 {
    print_error(&error.to_string());
    exit::for_error(error)
}

/// Cancel `cancel` on the first Ctrl+C or SIGTERM.
///
/// Later signals are swallowed by the installed handlers, so a second Ctrl+C
/// during teardown does not cut it short.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            result = ctrl_c => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                tracing::info!("Received Ctrl+C, closing session...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, closing session...");
            }
        }

        cancel.cancel();
    });
}
