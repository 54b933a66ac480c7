//! Service implementations
//!
//! Real implementations of the supervisor's traits. These perform actual
//! process, socket, and HTTP I/O.

pub mod child_process;
pub mod health_prober;
pub mod port_checker;
pub mod process_output_handler;

#[cfg(test)]
mod tests;

pub use child_process::{shutdown_child, TokioChild, TokioProcessLauncher};
pub use health_prober::{HealthProber, HttpHealthCheck, ProbeBackoff, ProbePolicy};
pub use port_checker::TcpPortChecker;
