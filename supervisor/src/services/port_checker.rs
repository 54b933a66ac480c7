//! TCP port availability check

use async_trait::async_trait;
use shared::{process_debug, ProcessId};
use std::io;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::PortChecker;

/// Checks a port by connecting to it, then by trying to bind it.
///
/// A completed connection means a listener is present. A refused or timed out
/// connection is confirmed with a bind attempt, which also catches sockets
/// that are bound but not yet accepting.
pub struct TcpPortChecker {
    timeout: Duration,
}

impl TcpPortChecker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortChecker for TcpPortChecker {
    async fn is_port_free(&self, host: &str, port: u16) -> SupervisorResult<bool> {
        match timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                process_debug!(ProcessId::current(), "🔌 {}:{} accepted a connection", host, port);
                return Ok(false);
            }
            Ok(Err(e)) => {
                process_debug!(ProcessId::current(), "🔌 Connect to {}:{} failed: {}", host, port, e);
            }
            Err(_) => {
                process_debug!(ProcessId::current(), "🔌 Connect to {}:{} timed out", host, port);
            }
        }

        let bind_failed = |source: io::Error| SupervisorError::PortCheckFailed {
            host: host.to_string(),
            port,
            source,
        };

        match timeout(self.timeout, TcpListener::bind((host, port))).await {
            Ok(Ok(listener)) => {
                drop(listener);
                Ok(true)
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::AddrInUse => Ok(false),
            Ok(Err(e)) => Err(bind_failed(e)),
            Err(_) => Err(bind_failed(io::Error::new(
                io::ErrorKind::TimedOut,
                "bind attempt timed out",
            ))),
        }
    }
}
