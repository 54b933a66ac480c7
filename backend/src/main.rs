//! Backend child process entry point
//!
//! Launched by the front-end's supervisor, which passes the bind address
//! through `BACKEND_HOST`/`BACKEND_PORT`. Results are kept in the JSON file
//! named by `--data-path`/`BACKEND_DATA_PATH`.

use clap::Parser;
use shared::logging::{self, LogTarget};
use shared::ProcessId;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use backend::{AppState, BackendError, BackendResult, DataStore};

/// Command line arguments; the supervisor sets the matching environment variables
#[derive(Parser, Debug)]
#[command(name = "backend")]
#[command(about = "XML processing backend supervised by the MCP front-end")]
struct Args {
    /// Bind host
    #[arg(long, env = "BACKEND_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bind port
    #[arg(long, env = "BACKEND_PORT", default_value = "5001")]
    port: u16,

    /// JSON file holding stored results
    #[arg(long, env = "BACKEND_DATA_PATH", default_value = backend::DEFAULT_DATA_PATH)]
    data_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> BackendResult<()> {
    let args = Args::parse();

    ProcessId::init_backend();
    logging::init_tracing(Some(&args.log_level), LogTarget::Stdout);
    logging::log_startup(ProcessId::current(), "backend service");

    let store = DataStore::open(&args.data_path).await?;

    // Installed before binding so a stop request during startup is not lost
    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .map_err(|source| BackendError::ServerStartup { addr, source })?;

    let shutdown = async move {
        #[cfg(unix)]
        let terminated = async move {
            terminate.recv().await;
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        tokio::select! {
            result = signal::ctrl_c() => match result {
                Ok(()) => logging::log_shutdown(ProcessId::current(), "Received SIGINT"),
                Err(e) => logging::log_error(ProcessId::current(), "Signal handling", &e),
            },
            _ = terminated => logging::log_shutdown(ProcessId::current(), "Received SIGTERM"),
        }
    };

    backend::serve(listener, Arc::new(AppState::with_store(store)), shutdown).await?;

    logging::log_success(ProcessId::current(), "Backend stopped gracefully");
    Ok(())
}
