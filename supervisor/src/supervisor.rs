//! Backend lifecycle supervisor
//!
//! Drives one backend child through
//! `IDLE -> LAUNCHING -> READY -> STOPPING -> STOPPED`, or into `FAILED`.
//! A supervisor instance is single-use: once terminal it never restarts.

use shared::logging::{log_error, log_success};
use shared::{process_debug, process_info, process_warn, HealthReport, HealthStatus, ProcessId, SupervisorState};
use std::sync::{Mutex as StdMutex, PoisonError};
use tokio::sync::{watch, Mutex};

use crate::config::SupervisorConfig;
use crate::error::{StartupPhase, SupervisorError, SupervisorResult};
use crate::services::{
    shutdown_child, HealthProber, HttpHealthCheck, TcpPortChecker, TokioProcessLauncher,
};
use crate::state::{ChildProcessRecord, ChildState, StateCell};
use crate::traits::{ChildProcess, ExitResult, HealthCheck, PortChecker, ProcessLauncher};

/// How a `stop` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Already stopping, stopped, or failed; nothing was done
    AlreadyStopped,
    /// No child was running
    NoChild,
    /// Child exited within the grace period
    Graceful,
    /// Child had to be force-killed
    Killed,
}

#[derive(Debug, Default)]
struct Observed {
    health: HealthStatus,
    attempts: u32,
    /// Last launched child; kept after exit so callers can inspect it
    record: Option<ChildProcessRecord>,
}

/// Supervisor wired to the real port checker, launcher, and HTTP probe
pub type BackendSupervisor = Supervisor<TcpPortChecker, TokioProcessLauncher, HttpHealthCheck>;

pub struct Supervisor<P, L, C>
where
    P: PortChecker,
    L: ProcessLauncher,
    C: HealthCheck,
{
    config: SupervisorConfig,
    port_checker: P,
    launcher: L,
    prober: HealthProber<C>,
    state: StateCell,
    /// Held by `start` for the whole launch and by `stop` for teardown, so at
    /// most one of them touches the child at a time
    child: Mutex<Option<Box<dyn ChildProcess>>>,
    observed: StdMutex<Observed>,
}

impl BackendSupervisor {
    /// Build a supervisor with the real service implementations
    pub fn from_config(config: SupervisorConfig) -> SupervisorResult<Self> {
        config.validate()?;
        let port_checker = TcpPortChecker::new(config.port_check_timeout);
        let health_check = HttpHealthCheck::new(config.probe_timeout)?;
        Ok(Self::new(config, port_checker, TokioProcessLauncher::new(), health_check))
    }
}

impl<P, L, C> Supervisor<P, L, C>
where
    P: PortChecker,
    L: ProcessLauncher,
    C: HealthCheck,
{
    pub fn new(config: SupervisorConfig, port_checker: P, launcher: L, health_check: C) -> Self {
        let prober = HealthProber::new(health_check, config.probe_policy());
        Self {
            config,
            port_checker,
            launcher,
            prober,
            state: StateCell::new(),
            child: Mutex::new(None),
            observed: StdMutex::new(Observed::default()),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn state(&self) -> SupervisorState {
        self.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state.get() == SupervisorState::Ready
    }

    /// Receiver that observes every state transition
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Wait until the supervisor is `Ready` or terminal
    ///
    /// # Returns
    /// `true` if it became ready
    pub async fn wait_ready(&self) -> bool {
        let mut rx = self.state.subscribe();
        let reached = rx
            .wait_for(|state| *state == SupervisorState::Ready || state.is_terminal())
            .await
            .map(|state| *state);
        matches!(reached, Ok(SupervisorState::Ready))
    }

    /// Wait until the supervisor is `Stopped` or `Failed`
    pub async fn wait_terminal(&self) -> SupervisorState {
        let mut rx = self.state.subscribe();
        let reached = rx
            .wait_for(|state| state.is_terminal())
            .await
            .map(|state| *state);
        reached.unwrap_or_else(|_| self.state.get())
    }

    /// Latest health status and the total number of probe attempts so far
    pub fn health(&self) -> HealthReport {
        let observed = self.observed();
        HealthReport::new(observed.health, observed.attempts)
    }

    /// PID of the running child, if any
    pub fn child_pid(&self) -> Option<u32> {
        self.observed()
            .record
            .as_ref()
            .filter(|record| record.state != ChildState::Exited)
            .and_then(|record| record.pid)
    }

    /// Launch details of the most recent child, including after it exited
    pub fn child_record(&self) -> Option<ChildProcessRecord> {
        self.observed().record.clone()
    }

    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    fn observed(&self) -> std::sync::MutexGuard<'_, Observed> {
        self.observed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_child_state(&self, state: ChildState) {
        if let Some(record) = self.observed().record.as_mut() {
            record.state = state;
        }
    }

    fn cancelled(&self, phase: StartupPhase) -> SupervisorError {
        process_info!(ProcessId::current(), "🛑 Startup cancelled during {}", phase);
        SupervisorError::StartupCancelled {
            phase,
            last_health: self.observed().health,
        }
    }

    /// Record a startup failure. A concurrent `stop` that already moved the
    /// state to `Stopping` keeps ownership of the final transition.
    fn fail_startup(&self, error: SupervisorError) -> SupervisorError {
        let _ = self
            .state
            .transition(&[SupervisorState::Launching], SupervisorState::Failed);
        log_error(ProcessId::current(), "Backend startup", &error);
        error
    }

    fn still_launching(&self) -> bool {
        self.state.get() == SupervisorState::Launching
    }

    /// Check the port, launch the child, and probe it until healthy
    ///
    /// Valid only from `Idle`. On success the state is `Ready`. On any failure
    /// the child (if launched) is terminated before the error is returned and
    /// the state is `Failed`. A concurrent `stop` turns this into
    /// `StartupCancelled`.
    pub async fn start(&self) -> SupervisorResult<()> {
        self.state
            .transition(&[SupervisorState::Idle], SupervisorState::Launching)
            .map_err(|state| SupervisorError::InvalidState {
                operation: "start",
                state,
            })?;

        let url = match self.config.health_url() {
            Ok(url) => url,
            Err(e) => return Err(self.fail_startup(e)),
        };
        process_info!(
            ProcessId::current(),
            "🚀 Launching backend on {} (health: {})",
            self.config.base_url(),
            url
        );

        let mut slot = self.child.lock().await;
        if !self.still_launching() {
            return Err(self.cancelled(StartupPhase::PortCheck));
        }

        // Port check
        match self
            .port_checker
            .is_port_free(&self.config.host, self.config.port)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                return Err(self.fail_startup(SupervisorError::PortConflict {
                    host: self.config.host.clone(),
                    port: self.config.port,
                    last_health: self.observed().health,
                }));
            }
            Err(e) => return Err(self.fail_startup(e)),
        }
        if !self.still_launching() {
            return Err(self.cancelled(StartupPhase::PortCheck));
        }

        // Launch
        let spec = self.config.launch_spec();
        let handle = match self.launcher.launch(&spec).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail_startup(e)),
        };
        {
            let mut observed = self.observed();
            observed.record = Some(ChildProcessRecord::new(&spec, handle.pid()));
            observed.health = HealthStatus::Starting;
        }
        let handle = slot.insert(handle);

        // Health probe, abandoned as soon as stop() is requested
        let mut state_rx = self.state.subscribe();
        let probe = tokio::select! {
            report = self.prober.wait_until_healthy(&url, handle.as_mut()) => Some(report),
            _ = state_rx.wait_for(|state| *state == SupervisorState::Stopping) => None,
        };

        let Some(report) = probe else {
            return Err(self.cancelled(StartupPhase::HealthProbe));
        };
        {
            let mut observed = self.observed();
            observed.health = report.status;
            observed.attempts += report.attempts;
        }

        if report.status == HealthStatus::Healthy {
            return match self
                .state
                .transition(&[SupervisorState::Launching], SupervisorState::Ready)
            {
                Ok(_) => {
                    log_success(
                        ProcessId::current(),
                        &format!(
                            "Backend ready at {} after {} probe attempt(s)",
                            self.config.base_url(),
                            report.attempts
                        ),
                    );
                    Ok(())
                }
                Err(_) => Err(self.cancelled(StartupPhase::HealthProbe)),
            };
        }

        process_warn!(
            ProcessId::current(),
            "💔 Backend not healthy ({}) after {} attempt(s); terminating child",
            report.status,
            report.attempts
        );
        if let Some(mut handle) = slot.take() {
            self.set_child_state(ChildState::Stopping);
            if let Err(e) = shutdown_child(
                handle.as_mut(),
                self.config.shutdown_grace,
                self.config.kill_wait,
            )
            .await
            {
                log_error(ProcessId::current(), "Terminating unhealthy backend", &e);
            }
            self.set_child_state(ChildState::Exited);
        }

        Err(self.fail_startup(SupervisorError::HealthCheckTimeout {
            url,
            last_health: report.status,
            attempts: report.attempts,
        }))
    }

    /// Stop the child: graceful signal, then forced kill after the grace period
    ///
    /// Valid from any state. From `Idle` it moves straight to `Stopped`; while
    /// already `Stopping` or terminal it does nothing. A `start` in progress is
    /// cancelled and the child it launched is torn down here.
    pub async fn stop(&self) -> SupervisorResult<StopOutcome> {
        let previous = match self.state.transition(
            &[
                SupervisorState::Idle,
                SupervisorState::Launching,
                SupervisorState::Ready,
            ],
            SupervisorState::Stopping,
        ) {
            Ok(previous) => previous,
            Err(state) => {
                process_debug!(ProcessId::current(), "stop() ignored while {}", state);
                return Ok(StopOutcome::AlreadyStopped);
            }
        };
        process_info!(ProcessId::current(), "🛑 Stopping backend (was {})", previous);

        let mut slot = self.child.lock().await;
        let outcome = match slot.take() {
            None => StopOutcome::NoChild,
            Some(mut handle) => {
                self.set_child_state(ChildState::Stopping);
                let result = shutdown_child(
                    handle.as_mut(),
                    self.config.shutdown_grace,
                    self.config.kill_wait,
                )
                .await;
                self.set_child_state(ChildState::Exited);

                match result {
                    Ok(ExitResult::Killed { .. }) => StopOutcome::Killed,
                    Ok(_) => StopOutcome::Graceful,
                    Err(e) => {
                        self.state.fail();
                        log_error(ProcessId::current(), "Stopping backend", &e);
                        return Err(e);
                    }
                }
            }
        };
        drop(slot);

        let _ = self
            .state
            .transition(&[SupervisorState::Stopping], SupervisorState::Stopped);
        log_success(ProcessId::current(), &format!("Backend stopped ({outcome:?})"));
        Ok(outcome)
    }
}
