//! dpx: Command-line interface
//!
//! Provides the `dpx` binary, which opens the web consoles of a Dataproc
//! cluster in a browser proxied through an SSH SOCKS tunnel to its master
//! node.

pub mod args;
pub mod exit;
pub mod output;
