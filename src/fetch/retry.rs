//! Retry policy with exponential backoff
//!
//! A request is attempted once plus `max_retries` more times. After a failed
//! attempt `n` (0-indexed) the client waits `2^n` backoff units, except after
//! the final attempt. Read timeouts are handled separately: the first one
//! doubles the read timeout instead of backing off.

use std::time::Duration;

/// Bounds and pacing for retried requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,

    /// Duration of one backoff unit
    pub backoff_unit: Duration,

    /// Double the read timeout once after the first read timeout
    pub escalate_read_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
            escalate_read_timeout: true,
        }
    }
}

impl RetryPolicy {
    /// Total attempts allowed before escalation bonuses
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after failed attempt `attempt` (0-indexed)
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use sumi_binder::fetch::RetryPolicy;
    ///
    /// let policy = RetryPolicy {
    ///     backoff_unit: Duration::from_millis(100),
    ///     ..RetryPolicy::default()
    /// };
    /// assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
    /// assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
    /// ```
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Ephemeral per-request retry bookkeeping
///
/// Discarded once the request succeeds or is given up on.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempts: u32,
    budget: u32,
    read_timeout: Duration,
    escalated: bool,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy, read_timeout: Duration) -> Self {
        Self {
            attempts: 0,
            budget: policy.max_attempts(),
            read_timeout,
            escalated: false,
        }
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.budget
    }

    /// Read timeout to use for the next attempt
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Records a failed attempt
    pub fn record_failure(&mut self) {
        self.attempts += 1;
    }

    /// Applies the one-time read-timeout escalation
    ///
    /// Returns false when escalation is disabled or already used. When the
    /// timeout hit the last budgeted attempt, one extra attempt is granted so
    /// the escalated timeout actually gets tried.
    pub fn escalate(&mut self, policy: &RetryPolicy) -> bool {
        if !policy.escalate_read_timeout || self.escalated {
            return false;
        }

        self.escalated = true;
        self.read_timeout = self.read_timeout.saturating_mul(2);
        if !self.has_attempts_left() {
            self.budget += 1;
        }
        true
    }
}
