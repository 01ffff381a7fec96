//! Core trait definitions

mod locator;
mod process;

pub use locator::ClusterLocator;
pub use process::{BrowserProcess, ProcessLauncher, TunnelProcess};
