//! Front-end error types

use shared::{SharedError, SupervisorState};
use supervisor::SupervisorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("backend unavailable: supervisor is {state}")]
    BackendUnavailable { state: SupervisorState },

    /// Error reported by the backend itself; `message` is relayed verbatim
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("backend request failed: {message}")]
    Transport { message: String },

    #[error("unexpected backend response: {message}")]
    UnexpectedResponse { message: String },

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl FrontendError {
    /// Whether the failure is per-request and the front-end can keep serving
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrontendError::BackendUnavailable { .. }
                | FrontendError::Backend { .. }
                | FrontendError::Transport { .. }
                | FrontendError::UnexpectedResponse { .. }
                | FrontendError::InvalidArguments { .. }
                | FrontendError::UnknownTool { .. }
        )
    }
}

pub type FrontendResult<T> = Result<T, FrontendError>;
