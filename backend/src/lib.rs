//! Backend service library
//!
//! The HTTP service launched and supervised by the front-end: content
//! analysis, XML rendering, and a JSON-file result store behind a JSON API,
//! plus the `/health` liveness endpoint.

pub mod error;
pub mod processor;
pub mod routes;
pub mod store;

pub use error::{BackendError, BackendResult};
pub use routes::{build_router, AppState, SharedState, SERVICE_NAME};
pub use store::{DataStore, DEFAULT_DATA_PATH};

use shared::{process_info, ProcessId};
use std::future::Future;
use tokio::net::TcpListener;

/// Serve the API on `listener` until `shutdown` resolves, then drain in-flight requests
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> BackendResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    process_info!(ProcessId::current(), "🌐 Backend listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
