//! Trait definitions with mockall annotations for testing
//!
//! Every side effect the supervisor performs goes through one of these seams:
//! port probing, process spawning, signalling the child, and HTTP liveness
//! checks. The real implementations live in `services`.

use crate::error::SupervisorResult;
use std::path::PathBuf;
use std::time::Duration;

/// Where the child's stdout/stderr go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildOutput {
    /// Share the parent's stdout/stderr
    Inherit,
    /// Discard everything
    Null,
    /// Pipe both streams and re-emit each line through tracing, tagged with `name`
    Log { name: String },
}

/// Everything needed to spawn the backend child
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Extra environment entries layered over the parent's environment
    pub env: Vec<(String, String)>,
    pub output: ChildOutput,
}

impl LaunchSpec {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            output: ChildOutput::Inherit,
        }
    }

    /// Add arguments (fluent API)
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment entry (fluent API)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory (fluent API)
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set output handling (fluent API)
    pub fn with_output(mut self, output: ChildOutput) -> Self {
        self.output = output;
        self
    }
}

/// How hard to ask the child to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGTERM on unix; the child may clean up
    Graceful,
    /// SIGKILL; cannot be caught
    Forced,
}

/// Outcome of waiting for the child to exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitResult {
    /// Exited on its own or after the graceful signal. `code` is `None` when
    /// the process was ended by a signal.
    Exited { code: Option<i32> },
    /// Exited only after the forced kill
    Killed { code: Option<i32> },
    /// Still running when the wait expired
    TimedOut,
}

/// Handle to one spawned child process
///
/// Implementations must treat signalling an already-exited child as success.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ChildProcess: Send {
    /// OS process id, if the platform reported one
    fn pid(&self) -> Option<u32>;

    /// Non-blocking liveness check; reaps the child if it has exited
    fn is_alive(&mut self) -> bool;

    /// Send a termination signal; a no-op when the child is already gone
    async fn terminate(&mut self, signal: TerminationSignal) -> SupervisorResult<()>;

    /// Wait up to `timeout` for the child to exit
    async fn wait_exit(&mut self, timeout: Duration) -> SupervisorResult<ExitResult>;
}

/// Process spawning abstraction
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawn the child described by `spec`
    ///
    /// # Returns
    /// A handle owning the child; the child is killed if the handle is dropped
    async fn launch(&self, spec: &LaunchSpec) -> SupervisorResult<Box<dyn ChildProcess>>;
}

/// Port availability abstraction
#[mockall::automock]
#[async_trait::async_trait]
pub trait PortChecker: Send + Sync {
    /// Report whether `host:port` can be taken by a new listener
    ///
    /// # Returns
    /// `Ok(false)` when something already listens there, `Err` when the
    /// check itself could not be performed
    async fn is_port_free(&self, host: &str, port: u16) -> SupervisorResult<bool>;
}

/// Single liveness request abstraction
#[mockall::automock]
#[async_trait::async_trait]
pub trait HealthCheck: Send + Sync {
    /// Issue one liveness request against `url`; `Ok` only for a success status
    async fn check(&self, url: &str) -> SupervisorResult<()>;
}
