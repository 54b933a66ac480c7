//! Supervisor configuration
//!
//! Values come from defaults, then `BACKEND_*` environment variables, then
//! explicit overrides applied by the binary (command-line flags).

use crate::error::SupervisorResult;
use crate::services::health_prober::{ProbeBackoff, ProbePolicy};
use crate::traits::{ChildOutput, LaunchSpec};
use shared::SharedError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_PROBE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
pub const DEFAULT_KILL_WAIT: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKEND_BINARY: &str = "backend";

/// Environment variable names
pub mod env_vars {
    pub const HOST: &str = "BACKEND_HOST";
    pub const PORT: &str = "BACKEND_PORT";
    pub const COMMAND: &str = "BACKEND_COMMAND";
    pub const ARGS: &str = "BACKEND_ARGS";
    pub const WORKDIR: &str = "BACKEND_WORKDIR";
    pub const HEALTH_PATH: &str = "BACKEND_HEALTH_PATH";
    pub const MAX_ATTEMPTS: &str = "BACKEND_MAX_ATTEMPTS";
    pub const PROBE_INTERVAL_MS: &str = "BACKEND_PROBE_INTERVAL_MS";
    pub const PROBE_TIMEOUT_MS: &str = "BACKEND_PROBE_TIMEOUT_MS";
    pub const PROBE_BACKOFF: &str = "BACKEND_PROBE_BACKOFF";
    pub const PORT_CHECK_TIMEOUT_MS: &str = "BACKEND_PORT_CHECK_TIMEOUT_MS";
    pub const SHUTDOWN_GRACE_MS: &str = "BACKEND_SHUTDOWN_GRACE_MS";
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    pub host: String,
    pub port: u16,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub output: ChildOutput,
    pub health_path: String,
    pub max_attempts: u32,
    pub probe_interval: Duration,
    pub max_probe_interval: Duration,
    pub probe_timeout: Duration,
    pub backoff: ProbeBackoff,
    pub port_check_timeout: Duration,
    pub shutdown_grace: Duration,
    pub kill_wait: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            command: default_backend_command(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            output: ChildOutput::Log {
                name: DEFAULT_BACKEND_BINARY.to_string(),
            },
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            max_probe_interval: DEFAULT_MAX_PROBE_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            backoff: ProbeBackoff::Fixed,
            port_check_timeout: DEFAULT_PORT_CHECK_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            kill_wait: DEFAULT_KILL_WAIT,
        }
    }
}

/// The `backend` binary installed next to the running executable, or a bare
/// `backend` resolved through `PATH` when that cannot be determined.
pub fn default_backend_command() -> PathBuf {
    let binary = format!("{DEFAULT_BACKEND_BINARY}{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&binary)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(binary))
}

fn parse_value<T: FromStr>(field: &str, raw: &str) -> SupervisorResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SharedError::invalid_config(field, raw).into())
}

fn parse_millis(field: &str, raw: &str) -> SupervisorResult<Duration> {
    parse_value::<u64>(field, raw).map(Duration::from_millis)
}

impl SupervisorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> SupervisorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> SupervisorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(env_vars::HOST) {
            config.host = host;
        }
        if let Some(raw) = lookup(env_vars::PORT) {
            config.port = parse_value(env_vars::PORT, &raw)?;
        }
        if let Some(command) = lookup(env_vars::COMMAND) {
            config.command = PathBuf::from(command);
        }
        if let Some(raw) = lookup(env_vars::ARGS) {
            config.args = raw.split_whitespace().map(str::to_string).collect();
        }
        if let Some(dir) = lookup(env_vars::WORKDIR) {
            config.working_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup(env_vars::HEALTH_PATH) {
            config.health_path = path;
        }
        if let Some(raw) = lookup(env_vars::MAX_ATTEMPTS) {
            config.max_attempts = parse_value(env_vars::MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::PROBE_INTERVAL_MS) {
            config.probe_interval = parse_millis(env_vars::PROBE_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::PROBE_TIMEOUT_MS) {
            config.probe_timeout = parse_millis(env_vars::PROBE_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::PROBE_BACKOFF) {
            config.backoff = parse_value(env_vars::PROBE_BACKOFF, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::PORT_CHECK_TIMEOUT_MS) {
            config.port_check_timeout = parse_millis(env_vars::PORT_CHECK_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::SHUTDOWN_GRACE_MS) {
            config.shutdown_grace = parse_millis(env_vars::SHUTDOWN_GRACE_MS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the supervisor cannot work with
    pub fn validate(&self) -> SupervisorResult<()> {
        if self.host.trim().is_empty() {
            return Err(SharedError::invalid_config("host", &self.host).into());
        }
        if self.port == 0 {
            return Err(SharedError::invalid_config("port", "0").into());
        }
        if self.command.as_os_str().is_empty() {
            return Err(SharedError::invalid_config("command", "").into());
        }
        if self.max_attempts == 0 {
            return Err(SharedError::invalid_config("max_attempts", "0").into());
        }
        if self.probe_timeout.is_zero() {
            return Err(SharedError::invalid_config("probe_timeout", "0").into());
        }
        if self.port_check_timeout.is_zero() {
            return Err(SharedError::invalid_config("port_check_timeout", "0").into());
        }
        self.health_url()?;
        Ok(())
    }

    /// Configure host (fluent API)
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Configure port (fluent API)
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Configure the child command and its arguments (fluent API)
    pub fn with_command<I, S>(mut self, command: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into();
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Configure child output handling (fluent API)
    pub fn with_output(mut self, output: ChildOutput) -> Self {
        self.output = output;
        self
    }

    /// Configure the probe budget (fluent API)
    pub fn with_probe(mut self, max_attempts: u32, interval: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.probe_interval = interval;
        self
    }

    /// Configure the per-attempt probe timeout (fluent API)
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Configure the probe backoff (fluent API)
    pub fn with_backoff(mut self, backoff: ProbeBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Configure the graceful and forced shutdown waits (fluent API)
    pub fn with_shutdown(mut self, grace: Duration, kill_wait: Duration) -> Self {
        self.shutdown_grace = grace;
        self.kill_wait = kill_wait;
        self
    }

    /// `http://host:port`, bracketing IPv6 literals
    pub fn base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Absolute URL of the liveness endpoint
    pub fn health_url(&self) -> SupervisorResult<String> {
        let base = Url::parse(&self.base_url())
            .map_err(|_| SharedError::invalid_config("host", &self.host))?;
        let url = base
            .join(&self.health_path)
            .map_err(|_| SharedError::invalid_config("health_path", &self.health_path))?;
        Ok(url.to_string())
    }

    pub fn probe_policy(&self) -> ProbePolicy {
        ProbePolicy {
            max_attempts: self.max_attempts,
            interval: self.probe_interval,
            max_interval: self.max_probe_interval,
            attempt_timeout: self.probe_timeout,
            backoff: self.backoff,
        }
    }

    /// Launch description handed to the process launcher. The child always
    /// learns its bind address through `BACKEND_HOST`/`BACKEND_PORT`.
    pub fn launch_spec(&self) -> LaunchSpec {
        let mut spec = LaunchSpec::new(&self.command)
            .with_args(self.args.iter().cloned())
            .with_output(self.output.clone());
        spec.working_dir = self.working_dir.clone();
        spec.env = self.env.clone();
        spec.with_env(env_vars::HOST, &self.host)
            .with_env(env_vars::PORT, self.port.to_string())
    }
}
