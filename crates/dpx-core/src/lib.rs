//! dpx-core: Core abstractions and configuration for dpx
//!
//! This crate provides the domain types, error taxonomy, configuration
//! structures and collaborator traits shared by the cloud locator, the
//! session coordinator and the CLI.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AuthError, ConfigError, LaunchError, LocatorError, SessionError, TerminationError, TunnelError,
};
pub use types::{
    BrowserState, ClusterSelector, NodeLocation, NodeStatus, SessionPhase, SessionRequest, Target,
    TunnelState, DEFAULT_REGION,
};
