//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Global process ID - set once at startup, used only to tag log lines
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

static UNASSIGNED: ProcessId = ProcessId::Unassigned;

/// Process identifier for any component in the system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// Protocol-facing front-end (owns the supervisor)
    Frontend,
    /// Supervised backend child
    Backend,
    /// Nothing registered yet (library code under test)
    Unassigned,
}

impl ProcessId {
    /// Initialize the global process ID for the front-end
    pub fn init_frontend() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Frontend)
    }

    /// Initialize the global process ID for the backend
    pub fn init_backend() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Backend)
    }

    /// Get the global process ID, or `Unassigned` when no binary registered one
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get().unwrap_or(&UNASSIGNED)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Frontend => write!(f, "frontend"),
            ProcessId::Backend => write!(f, "backend"),
            ProcessId::Unassigned => write!(f, "unassigned"),
        }
    }
}

/// Result of probing the backend's liveness endpoint.
///
/// Derived on every probe, never stored beyond the latest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HealthStatus {
    #[default]
    Unknown,
    /// Child launched, no successful probe yet
    Starting,
    Healthy,
    /// Child exited before it became healthy
    Unhealthy,
    /// Attempt budget exhausted with the child still alive
    TimedOut,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthStatus::Unknown => "UNKNOWN",
            HealthStatus::Starting => "STARTING",
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Unhealthy => "UNHEALTHY",
            HealthStatus::TimedOut => "TIMED_OUT",
        };
        f.write_str(name)
    }
}

/// Latest health status plus the number of probe attempts behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub attempts: u32,
}

impl HealthReport {
    pub fn new(status: HealthStatus, attempts: u32) -> Self {
        Self { status, attempts }
    }
}

/// Lifecycle state of a supervisor instance.
///
/// `Stopped` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SupervisorState {
    #[default]
    Idle,
    Launching,
    Ready,
    Stopping,
    Stopped,
    Failed,
}

impl SupervisorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SupervisorState::Stopped | SupervisorState::Failed)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Idle => "IDLE",
            SupervisorState::Launching => "LAUNCHING",
            SupervisorState::Ready => "READY",
            SupervisorState::Stopping => "STOPPING",
            SupervisorState::Stopped => "STOPPED",
            SupervisorState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
