//! Supervisor-specific error types

use shared::{HealthStatus, SharedError, SupervisorState};
use std::fmt;
use thiserror::Error;

/// Startup phase in which a launch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    PortCheck,
    Launch,
    HealthProbe,
}

impl fmt::Display for StartupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StartupPhase::PortCheck => "port check",
            StartupPhase::Launch => "launch",
            StartupPhase::HealthProbe => "health probe",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("port check failed: {host}:{port} is already in use (last health status: {last_health})")]
    PortConflict {
        host: String,
        port: u16,
        last_health: HealthStatus,
    },

    #[error("port check failed for {host}:{port}: {source}")]
    PortCheckFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("launch failed: could not spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("health probe failed: {url} reported {last_health} after {attempts} attempt(s)")]
    HealthCheckTimeout {
        url: String,
        last_health: HealthStatus,
        attempts: u32,
    },

    #[error("startup cancelled during {phase} (last health status: {last_health})")]
    StartupCancelled {
        phase: StartupPhase,
        last_health: HealthStatus,
    },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SupervisorState,
    },

    #[error("probe attempt failed: {message}")]
    ProbeFailed { message: String },

    #[error("failed to terminate child {pid}: {message}")]
    TerminationFailed { pid: u32, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SupervisorError {
    /// Startup phase the error belongs to, if it is a launch failure
    pub fn phase(&self) -> Option<StartupPhase> {
        match self {
            SupervisorError::PortConflict { .. } | SupervisorError::PortCheckFailed { .. } => {
                Some(StartupPhase::PortCheck)
            }
            SupervisorError::SpawnFailed { .. } => Some(StartupPhase::Launch),
            SupervisorError::HealthCheckTimeout { .. } => Some(StartupPhase::HealthProbe),
            SupervisorError::StartupCancelled { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Last health status observed before the failure
    pub fn last_health(&self) -> Option<HealthStatus> {
        match self {
            SupervisorError::PortConflict { last_health, .. }
            | SupervisorError::HealthCheckTimeout { last_health, .. }
            | SupervisorError::StartupCancelled { last_health, .. } => Some(*last_health),
            SupervisorError::PortCheckFailed { .. } | SupervisorError::SpawnFailed { .. } => {
                Some(HealthStatus::Unknown)
            }
            _ => None,
        }
    }

    /// True when startup ended because `stop` was requested, not because
    /// the backend failed
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SupervisorError::StartupCancelled { .. })
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
