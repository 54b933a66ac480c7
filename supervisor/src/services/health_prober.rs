//! HTTP liveness probing with a bounded retry budget

use async_trait::async_trait;
use shared::{process_debug, HealthReport, HealthStatus, ProcessId, SharedError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{ChildProcess, HealthCheck};

/// Delay growth between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeBackoff {
    #[default]
    Fixed,
    /// Doubles after every failed attempt, capped at `ProbePolicy::max_interval`
    Exponential,
}

impl FromStr for ProbeBackoff {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(ProbeBackoff::Fixed),
            "exponential" | "exp" => Ok(ProbeBackoff::Exponential),
            other => Err(SharedError::invalid_config("probe_backoff", other)),
        }
    }
}

impl fmt::Display for ProbeBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeBackoff::Fixed => f.write_str("fixed"),
            ProbeBackoff::Exponential => f.write_str("exponential"),
        }
    }
}

/// Retry budget for one startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub max_interval: Duration,
    /// Upper bound on a single attempt, including connection setup
    pub attempt_timeout: Duration,
    pub backoff: ProbeBackoff,
}

impl ProbePolicy {
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            max_interval: interval,
            attempt_timeout: Duration::from_secs(1),
            backoff: ProbeBackoff::Fixed,
        }
    }

    /// Sleep after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            ProbeBackoff::Fixed => self.interval,
            ProbeBackoff::Exponential => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                self.interval
                    .checked_mul(factor)
                    .unwrap_or(self.max_interval)
                    .min(self.max_interval.max(self.interval))
            }
        }
    }
}

/// Real liveness check: `GET url` expecting a 2xx status
pub struct HttpHealthCheck {
    client: reqwest::Client,
}

impl HttpHealthCheck {
    pub fn new(timeout: Duration) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SupervisorError::ProbeFailed {
                message: format!("could not build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, url: &str) -> SupervisorResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SupervisorError::ProbeFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SupervisorError::ProbeFailed {
                message: format!("{url} returned {status}"),
            })
        }
    }
}

/// Repeats a `HealthCheck` until it succeeds, the budget runs out, or the
/// child exits.
pub struct HealthProber<C: HealthCheck> {
    check: C,
    policy: ProbePolicy,
}

impl<C: HealthCheck> HealthProber<C> {
    pub fn new(check: C, policy: ProbePolicy) -> Self {
        Self { check, policy }
    }

    pub fn policy(&self) -> &ProbePolicy {
        &self.policy
    }

    /// Probe `url` until healthy
    ///
    /// # Returns
    /// `Healthy` on the first successful attempt, `Unhealthy` as soon as the
    /// child is seen dead, `TimedOut` once `max_attempts` attempts failed with
    /// the child still alive. Always finishes within roughly
    /// `max_attempts * (attempt_timeout + interval)`.
    pub async fn wait_until_healthy(&self, url: &str, child: &mut dyn ChildProcess) -> HealthReport {
        let policy = &self.policy;
        let mut attempts = 0;

        while attempts < policy.max_attempts {
            if !child.is_alive() {
                return HealthReport::new(HealthStatus::Unhealthy, attempts);
            }

            attempts += 1;
            let outcome = tokio::time::timeout(policy.attempt_timeout, self.check.check(url)).await;
            match outcome {
                Ok(Ok(())) => {
                    process_debug!(ProcessId::current(), "💚 {} healthy after {} attempt(s)", url, attempts);
                    return HealthReport::new(HealthStatus::Healthy, attempts);
                }
                Ok(Err(e)) => {
                    process_debug!(
                        ProcessId::current(),
                        "⏳ Probe {}/{} against {} failed: {}",
                        attempts,
                        policy.max_attempts,
                        url,
                        e
                    );
                }
                Err(_) => {
                    process_debug!(
                        ProcessId::current(),
                        "⏳ Probe {}/{} against {} timed out after {:?}",
                        attempts,
                        policy.max_attempts,
                        url,
                        policy.attempt_timeout
                    );
                }
            }

            if attempts < policy.max_attempts {
                tokio::time::sleep(policy.delay_after(attempts)).await;
            }
        }

        if child.is_alive() {
            HealthReport::new(HealthStatus::TimedOut, attempts)
        } else {
            HealthReport::new(HealthStatus::Unhealthy, attempts)
        }
    }
}
