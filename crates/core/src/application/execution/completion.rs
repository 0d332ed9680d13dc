// Execution completion signal

use tokio::sync::watch;

/// Why polling stopped without reaching a terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFailureKind {
    /// The platform no longer knows the execution
    NotFound,
    /// Too many consecutive failed fetches
    Exhausted,
}

/// Failure carried to every waiter of an abandoned execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollFailure {
    pub kind: PollFailureKind,
    pub attempts: u32,
    pub message: String,
}

pub type Completion = Result<(), PollFailure>;

/// Receiving side; clone it for every waiter
#[derive(Clone)]
pub struct CompletionSignal {
    rx: watch::Receiver<Option<Completion>>,
}

impl CompletionSignal {
    /// Wait for the outcome
    ///
    /// Resolves immediately when it was published before the call.
    pub async fn wait(&self) -> Completion {
        let mut rx = self.rx.clone();
        let published = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        published.unwrap_or_else(|| {
            Err(PollFailure {
                kind: PollFailureKind::Exhausted,
                attempts: 0,
                message: "polling stopped before the execution finished".to_string(),
            })
        })
    }
}

/// Publishing side, owned by the polling task
pub struct CompletionSender {
    tx: watch::Sender<Option<Completion>>,
}

impl CompletionSender {
    /// Publish the outcome; returns false if one was already published
    pub fn complete(&self, outcome: Completion) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }
}

/// Create a completion channel
pub fn completion_channel() -> (CompletionSender, CompletionSignal) {
    let (tx, rx) = watch::channel(None);
    (CompletionSender { tx }, CompletionSignal { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_outcome_wins() {
        let (sender, signal) = completion_channel();
        let mut waiting = tokio_test::task::spawn(signal.wait());
        tokio_test::assert_pending!(waiting.poll());

        assert!(sender.complete(Ok(())));
        tokio_test::assert_ready_ok!(waiting.poll());
        assert!(!sender.complete(Err(PollFailure {
            kind: PollFailureKind::NotFound,
            attempts: 1,
            message: "late".into(),
        })));

        tokio_test::assert_ok!(signal.wait().await);
        assert_eq!(signal.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn test_waiters_released_together() {
        let (sender, signal) = completion_channel();
        let a = tokio::spawn({
            let signal = signal.clone();
            async move { signal.wait().await }
        });
        let b = tokio::spawn({
            let signal = signal.clone();
            async move { signal.wait().await }
        });
        tokio::task::yield_now().await;

        sender.complete(Ok(()));
        assert_eq!(a.await.unwrap(), Ok(()));
        assert_eq!(b.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_dropped_sender_rejects() {
        let (sender, signal) = completion_channel();
        drop(sender);
        let outcome = signal.wait().await;
        assert_eq!(outcome.unwrap_err().kind, PollFailureKind::Exhausted);
    }
}
