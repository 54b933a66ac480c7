//! MCP request handling and the serve loop

use serde_json::{json, Value};
use shared::logging::log_error;
use shared::{process_debug, process_info, process_warn, ProcessId};
use tokio::io::{AsyncBufRead, AsyncWrite};

use super::protocol::{
    error_codes, initialize_result, JsonRpcRequest, JsonRpcResponse, ToolCallParams,
    ToolCallResult,
};
use super::tools;
use super::transport::{Incoming, LineTransport};
use crate::adapter::FrontendAdapter;
use crate::error::{FrontendError, FrontendResult};

pub struct McpServer {
    adapter: FrontendAdapter,
}

impl McpServer {
    pub fn new(adapter: FrontendAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &FrontendAdapter {
        &self.adapter
    }

    /// Serve requests until the input ends
    pub async fn serve<R, W>(&self, transport: &mut LineTransport<R, W>) -> FrontendResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        process_info!(ProcessId::current(), "🔗 Serving MCP over stdio");

        while let Some(incoming) = transport.read_message().await? {
            let response = match incoming {
                Incoming::Request(request) => self.handle(request).await,
                Incoming::Invalid { id, code, message } => {
                    process_warn!(ProcessId::current(), "⚠️ Rejected message: {}", message);
                    Some(JsonRpcResponse::failure(id, code, message))
                }
            };
            if let Some(response) = response {
                transport.write_response(&response).await?;
            }
        }

        process_info!(ProcessId::current(), "📭 Input closed");
        Ok(())
    }

    /// Handle one request; notifications produce no response
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        process_debug!(ProcessId::current(), "➡️ {}", request.method);

        let result = match request.method.as_str() {
            "initialize" => Ok(initialize_result(request.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::definitions() })),
            "tools/call" => self.call_tool(request.params).await,
            method if method.starts_with("notifications/") => {
                return None;
            }
            method => Err((
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        };

        let id = request.id?;
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::failure(id, code, message),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, (i32, String)> {
        let params: ToolCallParams = params
            .ok_or_else(|| "missing params".to_string())
            .and_then(|p| serde_json::from_value(p).map_err(|e| e.to_string()))
            .map_err(|message| (error_codes::INVALID_PARAMS, format!("Invalid tools/call params: {message}")))?;

        if !tools::is_known(&params.name) {
            return Err((
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            ));
        }

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let outcome = match tools::call(&self.adapter, &params.name, arguments).await {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                if !matches!(e, FrontendError::BackendUnavailable { .. }) {
                    log_error(ProcessId::current(), &format!("Tool {}", params.name), &e);
                }
                ToolCallResult::error(e.to_string())
            }
        };

        serde_json::to_value(outcome).map_err(|e| (error_codes::INTERNAL_ERROR, e.to_string()))
    }
}
