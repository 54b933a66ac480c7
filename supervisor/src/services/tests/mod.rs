//! Service-specific tests
//!
//! Each service has its own test file. Process tests spawn real `sh`/`sleep`
//! children and only run on unix.


// Common test utilities for services
pub mod common {
    use std::time::Duration;

    use crate::error::SupervisorError;

    /// Upper bound for operations that should finish almost immediately
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn probe_error() -> SupervisorError {
        SupervisorError::ProbeFailed {
            message: "connection refused".to_string(),
        }
    }
}
