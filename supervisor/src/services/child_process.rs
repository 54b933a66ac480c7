//! Real child process spawning and termination on top of `tokio::process`

use async_trait::async_trait;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};

use crate::error::{SupervisorError, SupervisorResult};
use crate::services::process_output_handler::{configure_child_stdio, spawn_output_forwarders};
use crate::traits::{ChildProcess, ExitResult, LaunchSpec, ProcessLauncher, TerminationSignal};
use shared::{process_debug, process_info, process_warn, ProcessId};

/// Spawns children with `tokio::process::Command`
///
/// Children are killed when their handle is dropped and, on Linux, when the
/// parent process dies.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> SupervisorResult<Box<dyn ChildProcess>> {
        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        configure_child_stdio(&mut cmd, &spec.output);

        #[cfg(target_os = "linux")]
        // SAFETY: the hook only calls prctl, which is async-signal-safe, and
        // touches no memory shared with the parent.
        unsafe {
            cmd.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|source| SupervisorError::SpawnFailed {
            command: spec.command.display().to_string(),
            source,
        })?;

        spawn_output_forwarders(&mut child, &spec.output);

        let handle = TokioChild::new(child);
        process_info!(
            ProcessId::current(),
            "🚀 Spawned {} (PID: {:?})",
            spec.command.display(),
            handle.pid()
        );
        Ok(Box::new(handle))
    }
}

/// Handle over a spawned `tokio::process::Child`
pub struct TokioChild {
    child: Child,
    pid: Option<u32>,
    exit_status: Option<ExitStatus>,
}

impl TokioChild {
    pub fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            exit_status: None,
        }
    }

    fn exited(&self) -> Option<ExitResult> {
        self.exit_status
            .map(|status| ExitResult::Exited { code: status.code() })
    }

    #[cfg(unix)]
    fn send_sigterm(&mut self) -> SupervisorResult<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else {
            return Ok(());
        };

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => {
                process_debug!(ProcessId::current(), "📨 Sent SIGTERM to PID {}", pid);
                Ok(())
            }
            // Exited between the liveness check and the signal
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(SupervisorError::TerminationFailed {
                pid,
                message: format!("SIGTERM failed: {e}"),
            }),
        }
    }

    #[cfg(not(unix))]
    fn send_sigterm(&mut self) -> SupervisorResult<()> {
        self.send_kill()
    }

    fn send_kill(&mut self) -> SupervisorResult<()> {
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(SupervisorError::TerminationFailed {
                pid: self.pid.unwrap_or_default(),
                message: format!("kill failed: {e}"),
            }),
        }
    }
}

#[async_trait]
impl ChildProcess for TokioChild {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        if self.exit_status.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.exit_status = Some(status);
                false
            }
            Err(e) => {
                process_warn!(ProcessId::current(), "⚠️ Could not poll child {:?}: {}", self.pid, e);
                false
            }
        }
    }

    async fn terminate(&mut self, signal: TerminationSignal) -> SupervisorResult<()> {
        if !self.is_alive() {
            return Ok(());
        }
        match signal {
            TerminationSignal::Graceful => self.send_sigterm(),
            TerminationSignal::Forced => self.send_kill(),
        }
    }

    async fn wait_exit(&mut self, timeout: Duration) -> SupervisorResult<ExitResult> {
        if let Some(exited) = self.exited() {
            return Ok(exited);
        }
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit_status = Some(status);
                Ok(ExitResult::Exited { code: status.code() })
            }
            Ok(Err(e)) => Err(SupervisorError::IoError(e)),
            Err(_) => Ok(ExitResult::TimedOut),
        }
    }
}

/// Stop a child: graceful signal, wait up to `grace`, then forced kill and
/// wait up to `kill_wait`.
///
/// # Returns
/// `Exited` when the child left within the grace period (or was already gone),
/// `Killed` when escalation was needed. Errors only if the child survives the
/// forced kill.
pub async fn shutdown_child(
    child: &mut dyn ChildProcess,
    grace: Duration,
    kill_wait: Duration,
) -> SupervisorResult<ExitResult> {
    let pid = child.pid();

    child.terminate(TerminationSignal::Graceful).await?;
    match child.wait_exit(grace).await? {
        ExitResult::TimedOut => {}
        exited => {
            process_info!(ProcessId::current(), "🛑 Child {:?} exited: {:?}", pid, exited);
            return Ok(exited);
        }
    }

    process_warn!(
        ProcessId::current(),
        "⏰ Child {:?} ignored graceful stop for {:?}, escalating to kill",
        pid,
        grace
    );
    child.terminate(TerminationSignal::Forced).await?;

    match child.wait_exit(kill_wait).await? {
        ExitResult::Exited { code } | ExitResult::Killed { code } => {
            process_info!(ProcessId::current(), "💀 Child {:?} killed", pid);
            Ok(ExitResult::Killed { code })
        }
        ExitResult::TimedOut => Err(SupervisorError::TerminationFailed {
            pid: pid.unwrap_or_default(),
            message: format!("still running {kill_wait:?} after kill"),
        }),
    }
}
