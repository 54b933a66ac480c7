//! Model Context Protocol surface: JSON-RPC 2.0 over newline-delimited stdio

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallResult, ToolDefinition};
pub use server::McpServer;
pub use transport::{Incoming, LineTransport, StdioTransport, MAX_MESSAGE_SIZE_BYTES};
