use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operator-configured bounds for cross-run retries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Retries disabled entirely.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            interval: Duration::ZERO,
        }
    }
}

/// Counter for delayed re-attempts after failed runs.
///
/// `current_attempt` never exceeds `policy.max_attempts`; once the budget
/// is spent the counter resets and nothing further is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    current_attempt: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    pub fn remaining(&self, policy: &RetryPolicy) -> u32 {
        policy.max_attempts.saturating_sub(self.current_attempt)
    }

    /// Register a failed run. Returns the delay before the next attempt
    /// while budget remains, `None` once the budget is exhausted (the
    /// counter then resets so the next scheduled day starts fresh).
    pub fn on_failure(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        if self.current_attempt < policy.max_attempts {
            self.current_attempt += 1;
            Some(policy.interval)
        } else {
            self.current_attempt = 0;
            None
        }
    }

    /// Any terminal run (Success or AlreadyDone) resets the counter.
    pub fn on_success(&mut self) {
        self.current_attempt = 0;
    }
}
