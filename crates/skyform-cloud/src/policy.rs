//! Poll timing policy per resource kind

use crate::action::Operation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Literal timing constants of one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
    pub interval: Duration,
}

impl Timings {
    pub const fn minutes(create: u64, update: u64, delete: u64, interval_secs: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Overall deadline budget of `operation`
    pub fn timeout_for(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Delete => self.delete,
            Operation::Update | Operation::Read | Operation::Import => self.update,
        }
    }

    /// Apply user overrides on top of the compiled constants
    pub fn with_overrides(mut self, overrides: &TimingOverrides) -> Self {
        if let Some(secs) = overrides.create_timeout_secs {
            self.create = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.update_timeout_secs {
            self.update = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.delete_timeout_secs {
            self.delete = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.interval_secs {
            self.interval = Duration::from_secs(secs);
        }
        self
    }
}

/// Optional per-kind overrides, all in seconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingOverrides {
    pub create_timeout_secs: Option<u64>,
    pub update_timeout_secs: Option<u64>,
    pub delete_timeout_secs: Option<u64>,
    pub interval_secs: Option<u64>,
}

/// Retry configuration for transient fetch failures while polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of consecutive failed fetches tolerated
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay_ms: u64,

    /// Maximum delay between retries
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}

/// Effective polling policy of a reconciler
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub timings: Timings,
    /// `None` keeps fail-fast behaviour: any fetch error aborts the session
    pub transient_retry: Option<RetryConfig>,
}

impl PollPolicy {
    pub fn new(timings: Timings) -> Self {
        Self {
            timings,
            transient_retry: None,
        }
    }

    pub fn with_transient_retry(mut self, retry: Option<RetryConfig>) -> Self {
        self.transient_retry = retry;
        self
    }
}
