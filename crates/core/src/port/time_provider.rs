// Time Provider & Scheduler Ports (for testability)

use async_trait::async_trait;
use std::time::Duration;

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Suspends the caller until the next scheduled tick
///
/// The execution tracker never sleeps directly; it asks the scheduler, so
/// tests can run the whole polling schedule without wall-clock delays.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Tokio timer scheduler (production)
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Virtual clock: `sleep` advances time instantly and records the delay
    #[derive(Clone)]
    pub struct ManualClock {
        now: Arc<AtomicI64>,
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl ManualClock {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: Arc::new(AtomicI64::new(start_millis)),
                sleeps: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn advance(&self, delay: Duration) {
            self.now
                .fetch_add(delay.as_millis() as i64, Ordering::SeqCst);
        }

        /// Every delay requested so far, in order
        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(1_000_000)
        }
    }

    impl TimeProvider for ManualClock {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Scheduler for ManualClock {
        async fn sleep(&self, delay: Duration) {
            self.sleeps.lock().unwrap().push(delay);
            self.advance(delay);
            // Let other tasks observe the Idle phase before the next cycle
            tokio::task::yield_now().await;
        }
    }
}
