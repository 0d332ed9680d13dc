// Execution Tracker - polling state machine for one remote execution

use super::backoff::{PollDecision, PollPolicy};
use super::completion::{
    completion_channel, CompletionSender, CompletionSignal, PollFailure, PollFailureKind,
};
use super::constants::{LOG_PAGE_LIMIT, LOG_POLL_INTERVAL};
use super::observer::ExecutionObserver;
use super::panic_guard::execute_guarded;
use crate::application::pagination::collect_pages;
use crate::domain::{
    Execution, ExecutionError, ExecutionRef, ExecutionSnapshot, ExecutionStatus, LogEntry,
    TimelineEvent,
};
use crate::error::{AppError, Result};
use crate::port::{RemoteService, Scheduler, SystemTimeProvider, TimeProvider, TokioScheduler};
use futures::future::BoxFuture;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where the polling task currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// A status fetch is in flight
    Polling,
    /// Sleeping until the next cycle
    Idle,
    /// Polling stopped for good
    Done,
}

/// Tuning of the polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub log_poll_interval: Duration,
    pub log_page_limit: u32,
    pub policy: PollPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_poll_interval: LOG_POLL_INTERVAL,
            log_page_limit: LOG_PAGE_LIMIT,
            policy: PollPolicy::default(),
        }
    }
}

/// Everything a tracker needs besides the execution id and observer
#[derive(Clone)]
pub struct TrackerRuntime {
    pub remote: Arc<dyn RemoteService>,
    pub time_provider: Arc<dyn TimeProvider>,
    pub scheduler: Arc<dyn Scheduler>,
    pub config: TrackerConfig,
}

impl TrackerRuntime {
    /// Production runtime: system clock and tokio timers
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self {
            remote,
            time_provider: Arc::new(SystemTimeProvider),
            scheduler: Arc::new(TokioScheduler),
            config: TrackerConfig::default(),
        }
    }

    pub fn with_clock(
        mut self,
        time_provider: Arc<dyn TimeProvider>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        self.time_provider = time_provider;
        self.scheduler = scheduler;
        self
    }

    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Work that must finish before waiters are released
///
/// The hook is started right before the outcome callback fires and awaited
/// right after it.
pub type SettleHook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Loop-owned control state
#[derive(Debug, Default)]
struct PollControl {
    attempts: u32,
    last_log_fetch_ms: Option<i64>,
    consecutive_failures: u32,
}

impl PollControl {
    fn log_fetch_due(&self, now_ms: i64, interval: Duration) -> bool {
        match self.last_log_fetch_ms {
            None => true,
            Some(last) => now_ms - last >= interval.as_millis() as i64,
        }
    }
}

enum PollStep {
    Continue(Duration),
    Settled,
    Abandoned(PollFailure),
}

struct Shared {
    execution_id: String,
    state: watch::Sender<ExecutionSnapshot>,
    phase: watch::Sender<PollPhase>,
    completion: CompletionSignal,
    observer: Arc<dyn ExecutionObserver>,
    runtime: TrackerRuntime,
}

/// Live view of one remote execution
///
/// Polling starts as soon as the tracker is created and runs on its own
/// task. Clones share the same state; once every clone is dropped the task
/// stops at its next tick, unless a settle hook still has to run.
#[derive(Clone)]
pub struct ExecutionTracker {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ExecutionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTracker")
            .field("execution_id", &self.shared.execution_id)
            .field("phase", &*self.shared.phase.borrow())
            .finish()
    }
}

impl ExecutionTracker {
    /// Start tracking an execution
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        execution_id: impl Into<String>,
        observer: Arc<dyn ExecutionObserver>,
        runtime: TrackerRuntime,
    ) -> Self {
        Self::start(execution_id, observer, runtime, None)
    }

    /// Start tracking with an optional settle hook
    pub fn start(
        execution_id: impl Into<String>,
        observer: Arc<dyn ExecutionObserver>,
        runtime: TrackerRuntime,
        settle: Option<SettleHook>,
    ) -> Self {
        let execution_id = execution_id.into();
        let (state, _) = watch::channel(ExecutionSnapshot::new(execution_id.clone()));
        let (phase, _) = watch::channel(PollPhase::Polling);
        let (sender, completion) = completion_channel();

        let shared = Arc::new(Shared {
            execution_id,
            state,
            phase,
            completion,
            observer,
            runtime,
        });

        debug!(execution_id = %shared.execution_id, "Execution tracker started");
        tokio::spawn(poll_loop(Arc::downgrade(&shared), sender, settle));

        Self { shared }
    }

    pub fn execution_id(&self) -> &str {
        &self.shared.execution_id
    }

    /// Copy of everything tracked so far
    pub fn snapshot(&self) -> ExecutionSnapshot {
        self.shared.state.borrow().clone()
    }

    pub fn status(&self) -> Option<ExecutionStatus> {
        self.shared.state.borrow().status
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.shared.state.borrow().logs.clone()
    }

    pub fn return_value(&self) -> Option<Value> {
        self.shared.state.borrow().return_value.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.shared.state.borrow().error.clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ExecutionSnapshot> {
        self.shared.state.subscribe()
    }

    pub fn phase(&self) -> PollPhase {
        *self.shared.phase.borrow()
    }

    /// Whether the execution reached a terminal status
    ///
    /// Waits for an in-flight poll to finish but never starts one.
    pub async fn is_done(&self) -> bool {
        let mut phase = self.shared.phase.subscribe();
        // The sender lives in `shared`, so the channel cannot close under us
        let _ = phase.wait_for(|p| *p != PollPhase::Polling).await;
        self.shared.state.borrow().is_terminal()
    }

    /// Wait until the execution settles
    ///
    /// Any number of callers may wait; all see the same outcome, and calls
    /// after completion return at once without polling again.
    pub async fn wait_for_done(&self) -> Result<ExecutionSnapshot> {
        match self.shared.completion.wait().await {
            Ok(()) => Ok(self.snapshot()),
            Err(failure) => Err(match failure.kind {
                PollFailureKind::NotFound => self.shared.missing(),
                PollFailureKind::Exhausted => AppError::PollingFailed {
                    execution_id: self.shared.execution_id.clone(),
                    attempts: failure.attempts,
                    message: failure.message,
                },
            }),
        }
    }

    /// Ask the platform to terminate the execution
    pub async fn kill(&self) -> Result<()> {
        let shared = &self.shared;
        shared
            .runtime
            .remote
            .kill_execution(&shared.execution_id)
            .await
            .map_err(|e| shared.not_found_as_missing(e))?;
        info!(execution_id = %shared.execution_id, "Kill requested");
        Ok(())
    }

    /// Start a fresh execution from this one and track it with the same observer
    pub async fn rerun(&self) -> Result<ExecutionTracker> {
        let shared = &self.shared;
        let ExecutionRef { execution_id } = shared
            .runtime
            .remote
            .rerun_execution(&shared.execution_id)
            .await
            .map_err(|e| shared.not_found_as_missing(e))?;

        info!(
            execution_id = %shared.execution_id,
            new_execution_id = %execution_id,
            "Execution rerun"
        );
        Ok(ExecutionTracker::new(
            execution_id,
            Arc::clone(&shared.observer),
            shared.runtime.clone(),
        ))
    }
}

/// Publishes `PollPhase::Done` however the polling task exits, unwinding included
struct PhaseGuard(Weak<Shared>);

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        if let Some(shared) = self.0.upgrade() {
            shared.phase.send_replace(PollPhase::Done);
        }
    }
}

async fn poll_loop(
    shared: Weak<Shared>,
    completion: CompletionSender,
    mut settle: Option<SettleHook>,
) {
    let _phase = PhaseGuard(shared.clone());
    // A pending settle hook must still run after every handle is dropped
    let _keep_alive = settle.as_ref().and_then(|_| shared.upgrade());
    let mut control = PollControl::default();

    loop {
        let Some(tracker) = shared.upgrade() else {
            debug!("Execution tracker dropped, polling stopped");
            return;
        };

        tracker.phase.send_replace(PollPhase::Polling);
        match tracker.poll_once(&mut control).await {
            PollStep::Continue(delay) => {
                tracker.phase.send_replace(PollPhase::Idle);
                let scheduler = Arc::clone(&tracker.runtime.scheduler);
                // Do not keep the tracker alive while sleeping
                drop(tracker);
                scheduler.sleep(delay).await;
            }
            PollStep::Settled => {
                let pending = settle.take().map(|hook| tokio::spawn(hook()));
                tracker.notify_outcome();
                if let Some(handle) = pending {
                    if let Err(e) = handle.await {
                        error!(execution_id = %tracker.execution_id, error = %e, "Settle hook failed");
                    }
                }
                completion.complete(Ok(()));
                tracker.phase.send_replace(PollPhase::Done);
                return;
            }
            PollStep::Abandoned(failure) => {
                error!(
                    execution_id = %tracker.execution_id,
                    attempts = %failure.attempts,
                    reason = %failure.message,
                    "Polling abandoned"
                );
                completion.complete(Err(failure));
                tracker.phase.send_replace(PollPhase::Done);
                return;
            }
        }
    }
}

impl Shared {
    fn missing(&self) -> AppError {
        AppError::NotFound(format!("Execution not found for id: {}", self.execution_id))
    }

    fn not_found_as_missing(&self, e: AppError) -> AppError {
        if e.is_not_found() {
            self.missing()
        } else {
            e
        }
    }

    async fn poll_once(&self, control: &mut PollControl) -> PollStep {
        let policy = &self.runtime.config.policy;

        match self.fetch_cycle(control).await {
            Ok((execution, logs)) => {
                control.consecutive_failures = 0;
                let status = execution.status;
                self.apply(execution, logs);

                if status.is_terminal() {
                    return PollStep::Settled;
                }

                let delay = policy.delay_for(control.attempts);
                control.attempts += 1;
                debug!(
                    execution_id = %self.execution_id,
                    status = %status,
                    attempt = %control.attempts,
                    delay_ms = %delay.as_millis(),
                    "Execution still running"
                );
                PollStep::Continue(delay)
            }
            Err(e) if e.is_not_found() => PollStep::Abandoned(PollFailure {
                kind: PollFailureKind::NotFound,
                attempts: control.attempts,
                message: e.to_string(),
            }),
            Err(e) => {
                control.consecutive_failures += 1;
                match policy.on_failure(&self.execution_id, control.consecutive_failures) {
                    PollDecision::Retry => {
                        let delay = policy.delay_for(control.attempts);
                        control.attempts += 1;
                        warn!(
                            execution_id = %self.execution_id,
                            consecutive_failures = %control.consecutive_failures,
                            delay_ms = %delay.as_millis(),
                            error = %e,
                            "Poll failed, retrying"
                        );
                        PollStep::Continue(delay)
                    }
                    PollDecision::GiveUp => PollStep::Abandoned(PollFailure {
                        kind: PollFailureKind::Exhausted,
                        attempts: control.attempts,
                        message: e.to_string(),
                    }),
                }
            }
        }
    }

    /// Fetch status, plus the log history when due; nothing is applied on failure
    async fn fetch_cycle(
        &self,
        control: &mut PollControl,
    ) -> Result<(Execution, Option<Vec<LogEntry>>)> {
        let execution = self.runtime.remote.get_execution(&self.execution_id).await?;

        let now = self.runtime.time_provider.now_millis();
        let logs = if execution.status.is_terminal()
            || control.log_fetch_due(now, self.runtime.config.log_poll_interval)
        {
            let logs = self.fetch_logs().await?;
            control.last_log_fetch_ms = Some(now);
            Some(logs)
        } else {
            None
        };

        Ok((execution, logs))
    }

    /// Full log history, oldest first
    async fn fetch_logs(&self) -> Result<Vec<LogEntry>> {
        let remote = &self.runtime.remote;
        let execution_id = self.execution_id.as_str();
        let mut logs = collect_pages(self.runtime.config.log_page_limit, |page, limit| {
            remote.get_execution_logs(execution_id, page, limit)
        })
        .await?;
        logs.sort_by(|a, b| a.cmp_timestamp(b));
        Ok(logs)
    }

    fn apply(&self, execution: Execution, logs: Option<Vec<LogEntry>>) {
        let mut fresh = Vec::new();

        self.state.send_modify(|snapshot| {
            snapshot.process_id = Some(execution.process_id);
            snapshot.status = Some(execution.status);
            snapshot.timeline = execution.timeline.map(|t| t.events).unwrap_or_default();
            snapshot.parameters = execution.parameters;
            snapshot.comment = execution.comment;

            if let Some(logs) = logs {
                fresh = merge_new_logs(&self.execution_id, &mut snapshot.logs, logs);
            }

            if execution.status.is_terminal() {
                snapshot.return_value = parse_return_value(execution.return_value.as_deref());
                snapshot.error = if execution.status.is_failure() {
                    resolve_error(execution.status, &snapshot.timeline, &snapshot.logs)
                } else {
                    None
                };
            }
        });

        for entry in &fresh {
            execute_guarded(&self.execution_id, "on_log", || self.observer.on_log(entry));
        }
    }

    fn notify_outcome(&self) {
        let (status, return_value, message) = {
            let snapshot = self.state.borrow();
            (
                snapshot.status,
                snapshot.return_value.clone(),
                snapshot.error.clone(),
            )
        };

        info!(
            execution_id = %self.execution_id,
            status = ?status,
            "Execution settled"
        );

        if status.is_some_and(ExecutionStatus::is_failure) {
            let err = ExecutionError { message };
            execute_guarded(&self.execution_id, "on_error", || self.observer.on_error(&err));
        } else {
            let value = return_value.unwrap_or(Value::Null);
            execute_guarded(&self.execution_id, "on_finish", || {
                self.observer.on_finish(&value)
            });
        }
    }
}

/// Append entries not delivered yet and return them
///
/// `incoming` must be sorted. An entry whose timestamp is already known is
/// a duplicate; one older than the last delivered entry arrived too late
/// and is skipped so that delivered logs stay in order.
fn merge_new_logs(
    execution_id: &str,
    known: &mut Vec<LogEntry>,
    incoming: Vec<LogEntry>,
) -> Vec<LogEntry> {
    let mut seen: HashSet<String> = known.iter().map(|l| l.timestamp.clone()).collect();
    let mut fresh = Vec::new();

    for entry in incoming {
        if seen.contains(&entry.timestamp) {
            continue;
        }
        if let Some(last) = known.last() {
            if entry.cmp_timestamp(last) == Ordering::Less {
                warn!(
                    execution_id = %execution_id,
                    timestamp = %entry.timestamp,
                    "Skipping log entry older than the last delivered one"
                );
                continue;
            }
        }
        seen.insert(entry.timestamp.clone());
        known.push(entry.clone());
        fresh.push(entry);
    }

    fresh
}

/// JSON when it parses, the raw string otherwise; empty means no value
fn parse_return_value(raw: Option<&str>) -> Option<Value> {
    let raw = raw.filter(|r| !r.is_empty())?;
    Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

/// Explanation of the event for `status`, else the last ERROR log line
fn resolve_error(
    status: ExecutionStatus,
    timeline: &[TimelineEvent],
    logs: &[LogEntry],
) -> Option<String> {
    timeline
        .iter()
        .find(|event| event.status == status)
        .and_then(|event| event.explanation.clone())
        .filter(|message| !message.is_empty())
        .or_else(|| {
            logs.iter()
                .rev()
                .find(|entry| entry.is_error())
                .map(|entry| entry.message.clone())
        })
}
