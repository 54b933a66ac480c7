//! Test helpers and builder patterns for supervisor tests

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ::supervisor::*;
use ::supervisor::traits::*;

use super::fixtures::TestFixtures;

pub type MockSupervisor = Supervisor<MockPortChecker, MockProcessLauncher, MockHealthCheck>;

/// Builder for supervisors wired to mocks, with permissive defaults:
/// the port is free, launch hands out a cooperative child, and every probe
/// succeeds.
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    port_checker: Option<MockPortChecker>,
    launcher: Option<MockProcessLauncher>,
    health_check: Option<MockHealthCheck>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            config: TestFixtures::config(),
            port_checker: None,
            launcher: None,
            health_check: None,
        }
    }

    pub fn with_config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_probe(mut self, max_attempts: u32, interval: Duration) -> Self {
        self.config = self.config.with_probe(max_attempts, interval);
        self
    }

    pub fn with_port_checker(mut self, port_checker: MockPortChecker) -> Self {
        self.port_checker = Some(port_checker);
        self
    }

    pub fn with_launcher(mut self, launcher: MockProcessLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Launcher that hands out `child` exactly once
    pub fn with_child(self, child: MockChildProcess) -> Self {
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .times(1)
            .return_once(move |_| Ok(Box::new(child) as Box<dyn ChildProcess>));
        self.with_launcher(launcher)
    }

    pub fn with_health_check(mut self, health_check: MockHealthCheck) -> Self {
        self.health_check = Some(health_check);
        self
    }

    pub fn build(self) -> MockSupervisor {
        let port_checker = self.port_checker.unwrap_or_else(|| {
            let mut mock = MockPortChecker::new();
            mock.expect_is_port_free().returning(|_, _| Ok(true));
            mock
        });
        let launcher = self.launcher.unwrap_or_else(|| {
            let mut mock = MockProcessLauncher::new();
            mock.expect_launch()
                .returning(|_| Ok(Box::new(TestFixtures::cooperative_child()) as Box<dyn ChildProcess>));
            mock
        });
        let health_check = self.health_check.unwrap_or_else(|| {
            let mut mock = MockHealthCheck::new();
            mock.expect_check().returning(|_| Ok(()));
            mock
        });

        Supervisor::new(self.config, port_checker, launcher, health_check)
    }
}

/// Real launcher that remembers the PID of every child it spawned
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    inner: TokioProcessLauncher,
    pids: Arc<Mutex<Vec<u32>>>,
}

impl RecordingLauncher {
    pub fn pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> SupervisorResult<Box<dyn ChildProcess>> {
        let child = self.inner.launch(spec).await?;
        if let Some(pid) = child.pid() {
            self.pids.lock().unwrap().push(pid);
        }
        Ok(child)
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// Health check that always fails
    pub fn failing_health_check() -> MockHealthCheck {
        let mut mock = MockHealthCheck::new();
        mock.expect_check()
            .returning(|_| Err(TestFixtures::probe_error()));
        mock
    }

    /// Wait until `condition` holds, polling every 10ms, for at most 5 seconds
    pub async fn eventually<F>(mut condition: F)
    where
        F: FnMut() -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(tokio::time::Instant::now() < deadline, "condition never became true");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Whether a process with `pid` still exists
    #[cfg(unix)]
    pub fn process_exists(pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), None).is_ok()
    }
}
