//! Main entry point for the front-end binary
//!
//! Starts the backend under supervision, serves MCP on stdin/stdout once the
//! backend is ready, and stops the backend on EOF or SIGINT/SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use frontend::{FrontendAdapter, FrontendResult, McpServer, StdioTransport};
use shared::logging::{self, LogTarget};
use shared::{process_debug, process_info, ProcessId};
use supervisor::{
    stop_on_signal, BackendSupervisor, ProbeBackoff, SignalListener, SupervisorConfig,
};

const STDIN_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// MCP front-end that supervises its backend service
#[derive(Parser)]
#[command(name = "frontend")]
#[command(about = "Serves MCP over stdio, backed by a supervised backend process")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Backend bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Backend bind port
    #[arg(long)]
    pub port: Option<u16>,

    /// Backend executable (defaults to the `backend` binary next to this one)
    #[arg(long)]
    pub backend_command: Option<PathBuf>,

    /// Extra argument for the backend (repeatable)
    #[arg(long = "backend-arg")]
    pub backend_args: Vec<String>,

    /// Working directory for the backend
    #[arg(long)]
    pub backend_workdir: Option<PathBuf>,

    /// Liveness path probed on the backend
    #[arg(long)]
    pub health_path: Option<String>,

    /// Health probe attempts before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Delay between health probes in milliseconds
    #[arg(long)]
    pub probe_interval_ms: Option<u64>,

    /// Per-probe timeout in milliseconds
    #[arg(long)]
    pub probe_timeout_ms: Option<u64>,

    /// Probe backoff (fixed or exponential)
    #[arg(long)]
    pub probe_backoff: Option<ProbeBackoff>,

    /// Port check timeout in milliseconds
    #[arg(long)]
    pub port_check_timeout_ms: Option<u64>,

    /// Grace period before the backend is force-killed, in milliseconds
    #[arg(long)]
    pub shutdown_grace_ms: Option<u64>,

    /// Timeout for each forwarded backend request, in milliseconds
    #[arg(long, default_value = "30000")]
    pub request_timeout_ms: u64,
}

impl Args {
    /// Layer command-line overrides over environment-derived configuration
    fn apply(&self, mut config: SupervisorConfig) -> SupervisorConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(command) = &self.backend_command {
            config.command = command.clone();
        }
        if !self.backend_args.is_empty() {
            config.args = self.backend_args.clone();
        }
        if let Some(dir) = &self.backend_workdir {
            config.working_dir = Some(dir.clone());
        }
        if let Some(path) = &self.health_path {
            config.health_path = path.clone();
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(ms) = self.probe_interval_ms {
            config.probe_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.probe_timeout_ms {
            config.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(backoff) = self.probe_backoff {
            config.backoff = backoff;
        }
        if let Some(ms) = self.port_check_timeout_ms {
            config.port_check_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.shutdown_grace_ms {
            config.shutdown_grace = Duration::from_millis(ms);
        }
        config
    }
}

fn main() -> FrontendResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    // A pending stdin read sits on a blocking thread and cannot be cancelled
    runtime.shutdown_timeout(STDIN_SHUTDOWN_TIMEOUT);
    result
}

async fn run(args: Args) -> FrontendResult<()> {
    // Stdout carries the protocol, so logs go to stderr
    ProcessId::init_frontend();
    logging::init_tracing(Some(&args.log_level), LogTarget::Stderr);
    logging::log_startup(ProcessId::current(), "MCP front-end");

    let config = args.apply(SupervisorConfig::from_env()?);
    process_debug!(ProcessId::current(), "Backend configuration: {:?}", config);
    let supervisor = Arc::new(BackendSupervisor::from_config(config)?);

    // Registered before start() so a signal during startup cancels it
    let listener = SignalListener::register()?;
    let mut signal_task = stop_on_signal(listener, Arc::clone(&supervisor));

    if let Err(e) = supervisor.start().await {
        if !e.is_cancellation() {
            signal_task.abort();
            return Err(e.into());
        }
        // The signal task owns the stop; wait for it and exit cleanly
        let _ = signal_task.await;
        logging::log_shutdown(ProcessId::current(), "signal received during startup");
        let final_state = supervisor.wait_terminal().await;
        process_info!(ProcessId::current(), "Backend supervisor finished in state {}", final_state);
        return Ok(());
    }

    let adapter = FrontendAdapter::new(
        &supervisor.base_url(),
        supervisor.subscribe(),
        Duration::from_millis(args.request_timeout_ms),
    )?;
    let server = McpServer::new(adapter);
    let mut transport = StdioTransport::stdio();

    tokio::select! {
        served = server.serve(&mut transport) => {
            if let Err(e) = served {
                logging::log_error(ProcessId::current(), "MCP serving", &e);
            }
            logging::log_shutdown(ProcessId::current(), "stdin closed");
            supervisor.stop().await?;
        }
        signal = &mut signal_task => {
            if signal.is_err() {
                supervisor.stop().await?;
            }
        }
    }

    let final_state = supervisor.wait_terminal().await;
    signal_task.abort();
    process_info!(ProcessId::current(), "Backend supervisor finished in state {}", final_state);

    logging::log_success(ProcessId::current(), "Front-end stopped gracefully");
    Ok(())
}
