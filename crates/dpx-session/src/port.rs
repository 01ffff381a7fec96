//! Local port selection for the SOCKS tunnel

use std::net::{Ipv4Addr, TcpListener};
use std::ops::Range;

use rand::Rng;

use dpx_core::config::TunnelConfig;
use dpx_core::SessionError;

/// Picks the local port the tunnel binds
#[derive(Debug, Clone)]
pub struct PortPicker {
    range: Range<u16>,
    attempts: u32,
    fixed: Option<u16>,
}

impl PortPicker {
    /// Random picks from the configured ephemeral range
    pub fn from_config(config: &TunnelConfig) -> Self {
        Self {
            range: config.port_range_start..config.port_range_end,
            attempts: config.port_attempts.max(1),
            fixed: None,
        }
    }

    /// Always use `port`
    pub fn fixed(port: u16) -> Self {
        Self {
            range: port..port.saturating_add(1),
            attempts: 1,
            fixed: Some(port),
        }
    }

    /// Use `port` when given, otherwise pick from the range
    pub fn with_override(self, port: Option<u16>) -> Self {
        match port {
            Some(port) => Self::fixed(port),
            None => self,
        }
    }

    /// Choose a port.
    ///
    /// A fixed port is returned as-is; a collision then surfaces when the
    /// tunnel fails to come up. Random picks are checked by binding and
    /// immediately releasing the port, which narrows but does not close the
    /// race with other processes.
    pub fn pick(&self) -> Result<u16, SessionError> {
        if let Some(port) = self.fixed {
            tracing::debug!("Using requested local port {}", port);
            return Ok(port);
        }

        if self.range.is_empty() {
            return Err(self.exhausted(0));
        }

        let mut rng = rand::thread_rng();
        for attempt in 1..=self.attempts {
            let port = rng.gen_range(self.range.clone());
            if is_port_free(port) {
                tracing::debug!("Picked local port {} (attempt {})", port, attempt);
                return Ok(port);
            }
            tracing::debug!("Local port {} is in use", port);
        }

        Err(self.exhausted(self.attempts))
    }

    fn exhausted(&self, attempts: u32) -> SessionError {
        SessionError::NoFreePort {
            start: self.range.start,
            end: self.range.end,
            attempts,
        }
    }
}

/// Whether 127.0.0.1:`port` can currently be bound
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
}
