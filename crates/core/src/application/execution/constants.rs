// Execution tracking constants (ADR: No magic values)
use std::time::Duration;

/// Minimum gap between two log history fetches while the execution runs (2s)
pub const LOG_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Poll delay for the first attempts (250ms)
pub const SHORT_POLL_DELAY: Duration = Duration::from_millis(250);

/// Poll delay once the execution has been running for a while (500ms)
pub const MEDIUM_POLL_DELAY: Duration = Duration::from_millis(500);

/// Poll delay for long-running executions (1s)
pub const LONG_POLL_DELAY: Duration = Duration::from_millis(1000);

/// Attempts 0..4 use the short delay
pub const SHORT_DELAY_ATTEMPTS: u32 = 4;

/// Attempts 4..12 use the medium delay, later ones the long delay
pub const MEDIUM_DELAY_ATTEMPTS: u32 = 12;

/// Consecutive failed status fetches before the tracker gives up
pub const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 10;

/// Page size used when walking the log history
pub const LOG_PAGE_LIMIT: u32 = 100;
