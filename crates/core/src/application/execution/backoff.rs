// Poll backoff policy
use super::constants::*;
use std::time::Duration;
use tracing::warn;

/// What to do after a failed status fetch
#[derive(Debug, PartialEq, Eq)]
pub enum PollDecision {
    /// Try again at the next scheduled tick
    Retry,
    /// Stop polling and reject the completion
    GiveUp,
}

/// Stepped backoff between status fetches
///
/// The delay depends only on how many non-terminal cycles already ran:
/// `attempts < short_attempts` waits `short_delay`, `attempts <
/// medium_attempts` waits `medium_delay`, anything later `long_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub short_delay: Duration,
    pub medium_delay: Duration,
    pub long_delay: Duration,
    pub short_attempts: u32,
    pub medium_attempts: u32,
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            short_delay: SHORT_POLL_DELAY,
            medium_delay: MEDIUM_POLL_DELAY,
            long_delay: LONG_POLL_DELAY,
            short_attempts: SHORT_DELAY_ATTEMPTS,
            medium_attempts: MEDIUM_DELAY_ATTEMPTS,
            max_consecutive_failures: MAX_CONSECUTIVE_POLL_FAILURES,
        }
    }
}

impl PollPolicy {
    /// Delay before the next cycle, given the attempts made so far
    pub fn delay_for(&self, attempts: u32) -> Duration {
        if attempts < self.short_attempts {
            self.short_delay
        } else if attempts < self.medium_attempts {
            self.medium_delay
        } else {
            self.long_delay
        }
    }

    /// Decide whether polling goes on after `consecutive_failures` failed fetches in a row
    pub fn on_failure(&self, execution_id: &str, consecutive_failures: u32) -> PollDecision {
        if consecutive_failures >= self.max_consecutive_failures {
            warn!(
                execution_id = %execution_id,
                consecutive_failures = %consecutive_failures,
                max = %self.max_consecutive_failures,
                "Max consecutive poll failures reached"
            );
            return PollDecision::GiveUp;
        }
        PollDecision::Retry
    }
}
