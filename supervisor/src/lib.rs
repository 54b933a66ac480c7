//! Backend process supervision
//!
//! Launches a backend HTTP service as a child process, waits for it to report
//! healthy, tracks its lifecycle, and tears it down gracefully on request or
//! on SIGINT/SIGTERM. All I/O goes through the traits in `traits`, so the
//! state machine can be exercised with mocks.

pub mod config;
pub mod error;
pub mod services;
pub mod signals;
pub mod state;
pub mod supervisor;
pub mod traits;

// Re-export commonly used types
pub use config::SupervisorConfig;
pub use error::{StartupPhase, SupervisorError, SupervisorResult};
pub use services::{HealthProber, HttpHealthCheck, ProbeBackoff, ProbePolicy, TcpPortChecker, TokioProcessLauncher};
pub use signals::{stop_on_signal, ShutdownSignal, SignalListener};
pub use state::{ChildProcessRecord, ChildState};
pub use supervisor::{BackendSupervisor, StopOutcome, Supervisor};
pub use traits::{
    ChildOutput, ChildProcess, ExitResult, HealthCheck, LaunchSpec, PortChecker, ProcessLauncher,
    TerminationSignal,
};
