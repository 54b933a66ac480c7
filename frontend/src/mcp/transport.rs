//! Newline-delimited JSON-RPC transport
//!
//! One message per line. Oversized lines are discarded without buffering
//! them whole.

use serde_json::Value;
use shared::{process_debug, ProcessId};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin,
    Stdout,
};

use super::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse};
use crate::error::FrontendResult;

pub const MAX_MESSAGE_SIZE_BYTES: usize = 4 * 1024 * 1024;

/// One decoded line
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Request(JsonRpcRequest),
    /// Line that could not be turned into a request; answer with an error
    Invalid { id: Value, code: i32, message: String },
}

pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    max_message_size: usize,
}

pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        LineTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_message_size: MAX_MESSAGE_SIZE_BYTES,
        }
    }

    /// Set the per-line size limit (fluent API)
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Read the next message, skipping blank lines
    ///
    /// # Returns
    /// `None` at end of input
    pub async fn read_message(&mut self) -> FrontendResult<Option<Incoming>> {
        loop {
            let mut buf = Vec::new();
            let limit = self.max_message_size as u64 + 1;
            let read = (&mut self.reader).take(limit).read_until(b'\n', &mut buf).await?;
            if read == 0 {
                return Ok(None);
            }

            if buf.len() > self.max_message_size && buf.last() != Some(&b'\n') {
                self.discard_line().await?;
                return Ok(Some(Incoming::Invalid {
                    id: Value::Null,
                    code: error_codes::INVALID_REQUEST,
                    message: format!(
                        "Message exceeded size limit of {} bytes",
                        self.max_message_size
                    ),
                }));
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                return Ok(Some(parse_error("Invalid UTF-8 in request")));
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            process_debug!(ProcessId::current(), "Received: {}", line);

            return Ok(Some(decode(line)));
        }
    }

    /// Drop input up to and including the next newline
    async fn discard_line(&mut self) -> FrontendResult<()> {
        loop {
            let (found, used) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|b| *b == b'\n') {
                    Some(pos) => (true, pos + 1),
                    None => (false, available.len()),
                }
            };
            self.reader.consume(used);
            if found {
                return Ok(());
            }
        }
    }

    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> FrontendResult<()> {
        let json = serde_json::to_string(response)?;
        process_debug!(ProcessId::current(), "Sending: {}", json);

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

fn parse_error(message: &str) -> Incoming {
    Incoming::Invalid {
        id: Value::Null,
        code: error_codes::PARSE_ERROR,
        message: message.to_string(),
    }
}

fn decode(line: &str) -> Incoming {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return parse_error(&format!("Failed to parse JSON-RPC request: {e}")),
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);

    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) if request.jsonrpc == super::protocol::JSONRPC_VERSION => Incoming::Request(request),
        Ok(request) => Incoming::Invalid {
            id,
            code: error_codes::INVALID_REQUEST,
            message: format!("Unsupported jsonrpc version '{}'", request.jsonrpc),
        },
        Err(e) => Incoming::Invalid {
            id,
            code: error_codes::INVALID_REQUEST,
            message: format!("Invalid JSON-RPC request: {e}"),
        },
    }
}
