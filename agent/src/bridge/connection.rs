//! Connection state machine with a single backoff policy

use std::fmt;
use std::time::Duration;

use crate::utils::{calc_jittered_backoff, CooldownOptions};

/// Connection state published by the bridge worker
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Not connected and not trying to be
    Idle,
    Connecting {
        attempt: u32,
    },
    Connected,
    /// Waiting `retry_in` before reconnect attempt `attempt`
    Backoff {
        attempt: u32,
        retry_in: Duration,
    },
    /// Attempt budget exhausted; no further reconnects
    Failed {
        reason: String,
    },
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting { .. } => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Backoff { .. } => "backoff",
            ConnectionState::Failed { .. } => "failed",
        }
    }

    pub fn attempt(&self) -> Option<u32> {
        match self {
            ConnectionState::Connecting { attempt } | ConnectionState::Backoff { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    pub fn retry_in(&self) -> Option<Duration> {
        match self {
            ConnectionState::Backoff { retry_in, .. } => Some(*retry_in),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting { attempt } => write!(f, "connecting (attempt {})", attempt),
            ConnectionState::Backoff { attempt, retry_in } => {
                write!(f, "backoff (attempt {} in {:?})", attempt, retry_in)
            }
            ConnectionState::Failed { reason } => write!(f, "failed: {}", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Exponential backoff with jitter and a bounded number of consecutive failures
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub cooldown: CooldownOptions,

    /// Relative jitter in `[0, 1]`
    pub jitter: f64,

    /// Consecutive failed attempts after which the machine enters `Failed`
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            cooldown: CooldownOptions {
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
            },
            jitter: 0.2,
            max_attempts: 10,
        }
    }
}

impl BackoffPolicy {
    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        calc_jittered_backoff(&self.cooldown, attempt.saturating_sub(1), self.jitter)
    }

    pub fn max_delay(&self) -> Duration {
        self.cooldown.max_delay
    }
}

/// Pure transition logic; the worker drives it and does the I/O
#[derive(Debug)]
pub struct ConnectionMachine {
    policy: BackoffPolicy,
    state: ConnectionState,
    failures: u32,
    stopped: bool,
}

impl ConnectionMachine {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Idle,
            failures: 0,
            stopped: false,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Begin a connection attempt from `Idle` or `Backoff`.
    ///
    /// Returns `false` and leaves the state untouched after shutdown, after
    /// failure, or while already connecting or connected.
    pub fn start(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        match self.state {
            ConnectionState::Idle | ConnectionState::Backoff { .. } => {
                self.state = ConnectionState::Connecting {
                    attempt: self.failures + 1,
                };
                true
            }
            _ => false,
        }
    }

    pub fn on_connected(&mut self) {
        if self.stopped {
            return;
        }
        if let ConnectionState::Connecting { .. } = self.state {
            self.failures = 0;
            self.state = ConnectionState::Connected;
        }
    }

    /// A connect attempt failed or an open connection dropped.
    ///
    /// Returns the delay before the next attempt, or `None` when no reconnect
    /// follows (shut down, or attempts exhausted).
    pub fn on_disconnected(&mut self, reason: &str) -> Option<Duration> {
        if self.stopped {
            self.state = ConnectionState::Idle;
            return None;
        }
        if !matches!(
            self.state,
            ConnectionState::Connecting { .. } | ConnectionState::Connected
        ) {
            return None;
        }

        self.failures += 1;
        if self.failures >= self.policy.max_attempts {
            self.state = ConnectionState::Failed {
                reason: format!("gave up after {} attempts: {}", self.policy.max_attempts, reason),
            };
            return None;
        }

        let retry_in = self.policy.delay(self.failures);
        self.state = ConnectionState::Backoff {
            attempt: self.failures + 1,
            retry_in,
        };
        Some(retry_in)
    }

    /// Intentional close; the machine never reconnects afterwards
    pub fn shutdown(&mut self) {
        self.stopped = true;
        self.state = ConnectionState::Idle;
    }

    /// Leave `Failed` or `Idle` for a fresh cycle, e.g. after a new login
    pub fn reset(&mut self) {
        if self.stopped {
            return;
        }
        self.failures = 0;
        self.state = ConnectionState::Idle;
    }
}
