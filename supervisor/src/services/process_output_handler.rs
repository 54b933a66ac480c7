//! Helper to handle child process stdout/stderr output
//!
//! - `Inherit`: the child writes straight to the parent's streams
//! - `Null`: output is discarded
//! - `Log`: both streams are piped and every line is re-emitted through
//!   tracing, so nothing reaches the parent's stdout

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;

use crate::traits::ChildOutput;
use shared::{process_debug, process_info, process_warn, ProcessId};

/// Configure stdio for a child process
pub fn configure_child_stdio(cmd: &mut tokio::process::Command, output: &ChildOutput) {
    cmd.stdin(Stdio::null());

    match output {
        ChildOutput::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        ChildOutput::Null => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        ChildOutput::Log { name } => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            process_debug!(ProcessId::current(), "🔗 {} output will be forwarded to the log", name);
        }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Spawn tasks that drain piped output into tracing
///
/// Consuming the pipes also keeps the child from blocking on a full buffer.
pub fn spawn_output_forwarders(child: &mut Child, output: &ChildOutput) {
    let ChildOutput::Log { name } = output else {
        return;
    };

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, name.clone(), Stream::Stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, name.clone(), Stream::Stderr));
    }
}

async fn forward_lines<R>(reader: R, name: String, stream: Stream)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match stream {
            Stream::Stdout => {
                process_info!(ProcessId::current(), "[{}] {}", name, line);
            }
            Stream::Stderr => {
                process_warn!(ProcessId::current(), "[{}] {}", name, line);
            }
        }
    }
}
