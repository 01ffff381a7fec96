//! dpx-session: Subprocess management and the session coordinator
//!
//! This crate owns the two long-running subprocesses of a dpx session, the
//! `gcloud compute ssh` SOCKS tunnel and the proxied browser, and the
//! coordinator that sequences them.
//!
//! # Overview
//!
//! - [`SshTunnel`] spawns the tunnel and polls the local port for readiness
//! - [`ChromeBrowser`] launches Chrome with a throwaway profile
//! - [`SystemLauncher`] builds both from configuration
//! - [`SessionCoordinator`] resolves the master node, connects, and tears
//!   everything down again

pub mod browser;
pub mod coordinator;
pub mod launcher;
pub mod port;
pub mod process;
pub mod tunnel;

pub use browser::{find_browser_executable, ChromeBrowser};
pub use coordinator::{SessionCoordinator, SessionEnd, SessionEvent, SessionHandles, SessionReport};
pub use launcher::SystemLauncher;
pub use port::PortPicker;
pub use tunnel::SshTunnel;
