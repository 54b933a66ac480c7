//! OS signal adapter
//!
//! Turns SIGINT/SIGTERM (Ctrl-C elsewhere) into a single call to
//! `Supervisor::stop`.

use shared::logging::{log_error, log_shutdown};
use shared::ProcessId;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::SupervisorResult;
use crate::supervisor::Supervisor;
use crate::traits::{HealthCheck, PortChecker, ProcessLauncher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Signal handlers installed up front, so a signal that arrives during
/// startup is not lost
pub struct SignalListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl SignalListener {
    /// Install the handlers; must be called inside a Tokio runtime
    #[cfg(unix)]
    pub fn register() -> SupervisorResult<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> SupervisorResult<Self> {
        Ok(Self {})
    }

    /// Wait for the next shutdown signal
    #[cfg(unix)]
    pub async fn recv(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
            _ = self.terminate.recv() => ShutdownSignal::Terminate,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> ShutdownSignal {
        let _ = tokio::signal::ctrl_c().await;
        ShutdownSignal::Interrupt
    }
}

/// Spawn a task that stops `supervisor` on the first shutdown signal
///
/// # Returns
/// Handle resolving to the signal that triggered the stop
pub fn stop_on_signal<P, L, C>(
    mut listener: SignalListener,
    supervisor: Arc<Supervisor<P, L, C>>,
) -> JoinHandle<ShutdownSignal>
where
    P: PortChecker + 'static,
    L: ProcessLauncher + 'static,
    C: HealthCheck + 'static,
{
    tokio::spawn(async move {
        let signal = listener.recv().await;
        log_shutdown(ProcessId::current(), &format!("received {signal}"));
        if let Err(e) = supervisor.stop().await {
            log_error(ProcessId::current(), "Signal-triggered stop", &e);
        }
        signal
    })
}
