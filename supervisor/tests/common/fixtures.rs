//! Test fixtures for supervisor tests

use std::time::Duration;
use ::supervisor::*;
use ::supervisor::traits::*;

pub struct TestFixtures;

impl TestFixtures {
    pub const HOST: &'static str = "127.0.0.1";
    pub const PORT: u16 = 5999;
    pub const PID: u32 = 4242;

    /// Fast probe and shutdown timings so failures surface quickly
    pub fn config() -> SupervisorConfig {
        SupervisorConfig::default()
            .with_host(Self::HOST)
            .with_port(Self::PORT)
            .with_command("backend-under-test", Vec::<String>::new())
            .with_output(ChildOutput::Null)
            .with_probe(5, Duration::from_millis(10))
            .with_probe_timeout(Duration::from_millis(200))
            .with_shutdown(Duration::from_millis(200), Duration::from_millis(200))
    }

    /// Child that stays alive until terminated and exits on the graceful signal
    pub fn cooperative_child() -> MockChildProcess {
        let mut child = MockChildProcess::new();
        child.expect_pid().return_const(Some(Self::PID));
        child.expect_is_alive().returning(|| true);
        child.expect_terminate().returning(|_| Ok(()));
        child
            .expect_wait_exit()
            .returning(|_| Ok(ExitResult::Exited { code: None }));
        child
    }

    pub fn probe_error() -> SupervisorError {
        SupervisorError::ProbeFailed {
            message: "connection refused".to_string(),
        }
    }

    pub fn spawn_error() -> SupervisorError {
        SupervisorError::SpawnFailed {
            command: "backend-under-test".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        }
    }
}
