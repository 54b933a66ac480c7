//! Supervisor state management
//!
//! Lifecycle state with atomic compare-and-set transitions, plus the record
//! of the currently managed child.

use chrono::{DateTime, Utc};
use shared::SupervisorState;
use std::path::PathBuf;
use tokio::sync::watch;

use crate::traits::LaunchSpec;

/// Lifecycle state shared between `start`, `stop`, and observers
///
/// Backed by a watch channel so observers can await transitions instead of
/// polling.
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<SupervisorState>,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SupervisorState::Idle);
        Self { tx }
    }

    pub fn get(&self) -> SupervisorState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.tx.subscribe()
    }

    /// Move to `to` only if the current state is one of `from`
    ///
    /// # Returns
    /// `Ok(previous)` on success, `Err(current)` when the state did not match
    pub fn transition(
        &self,
        from: &[SupervisorState],
        to: SupervisorState,
    ) -> Result<SupervisorState, SupervisorState> {
        let mut observed = SupervisorState::Idle;
        let changed = self.tx.send_if_modified(|state| {
            observed = *state;
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        });

        if changed {
            Ok(observed)
        } else {
            Err(observed)
        }
    }

    /// Move to `Failed` from any non-terminal state
    pub fn fail(&self) -> SupervisorState {
        let mut observed = SupervisorState::Idle;
        self.tx.send_if_modified(|state| {
            observed = *state;
            if state.is_terminal() {
                false
            } else {
                *state = SupervisorState::Failed;
                true
            }
        });
        observed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Running,
    Stopping,
    Exited,
}

/// What the supervisor knows about the child it launched
#[derive(Debug, Clone, PartialEq)]
pub struct ChildProcessRecord {
    pub pid: Option<u32>,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub started_at: DateTime<Utc>,
    pub state: ChildState,
}

impl ChildProcessRecord {
    pub fn new(spec: &LaunchSpec, pid: Option<u32>) -> Self {
        Self {
            pid,
            command: spec.command.clone(),
            args: spec.args.clone(),
            working_dir: spec.working_dir.clone(),
            env: spec.env.clone(),
            started_at: Utc::now(),
            state: ChildState::Running,
        }
    }
}
