//! Front-end process library
//!
//! Owns the backend supervisor, gates every backend call on its readiness,
//! and exposes the backend's operations as MCP tools over stdio.

pub mod adapter;
pub mod error;
pub mod mcp;

// Re-export commonly used types
pub use adapter::{FrontendAdapter, DEFAULT_REQUEST_TIMEOUT};
pub use error::{FrontendError, FrontendResult};
pub use mcp::{LineTransport, McpServer, StdioTransport};
