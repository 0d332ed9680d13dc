// Execution observer - callbacks fired by the tracker

use crate::domain::{ExecutionError, LogEntry};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Receives progress of one execution
///
/// Callbacks run on the polling task, in order, and must not block.
/// `on_log` fires once per new log entry; exactly one of `on_finish` or
/// `on_error` fires when the execution reaches a terminal status.
pub trait ExecutionObserver: Send + Sync {
    fn on_log(&self, entry: &LogEntry);

    /// Parsed return value, `Value::Null` when the execution returned nothing
    fn on_finish(&self, return_value: &Value);

    fn on_error(&self, error: &ExecutionError);
}

/// Default policy: log everything through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObserver;

impl ExecutionObserver for DefaultObserver {
    fn on_log(&self, entry: &LogEntry) {
        info!(
            timestamp = %entry.timestamp,
            level = %entry.level,
            "{}",
            entry.message
        );
    }

    fn on_finish(&self, return_value: &Value) {
        info!(return_value = %return_value, "Execution finished");
    }

    fn on_error(&self, err: &ExecutionError) {
        error!(error = %err, "Execution failed");
    }
}

type LogCallback = Box<dyn Fn(&LogEntry) + Send + Sync>;
type FinishCallback = Box<dyn Fn(&Value) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&ExecutionError) + Send + Sync>;

/// Caller-supplied callbacks; missing ones fall back to [`DefaultObserver`]
///
/// ```text
/// let events = ExecutionEvents::new()
///     .on_log(|entry| println!("{}", entry.message))
///     .on_finish(|value| println!("done: {}", value));
/// ```
#[derive(Default)]
pub struct ExecutionEvents {
    on_log: Option<LogCallback>,
    on_finish: Option<FinishCallback>,
    on_error: Option<ErrorCallback>,
}

impl ExecutionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_log(mut self, f: impl Fn(&LogEntry) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Box::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ExecutionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn into_observer(self) -> Arc<dyn ExecutionObserver> {
        Arc::new(self)
    }
}

impl std::fmt::Debug for ExecutionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEvents")
            .field("on_log", &self.on_log.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl ExecutionObserver for ExecutionEvents {
    fn on_log(&self, entry: &LogEntry) {
        match &self.on_log {
            Some(f) => f(entry),
            None => DefaultObserver.on_log(entry),
        }
    }

    fn on_finish(&self, return_value: &Value) {
        match &self.on_finish {
            Some(f) => f(return_value),
            None => DefaultObserver.on_finish(return_value),
        }
    }

    fn on_error(&self, err: &ExecutionError) {
        match &self.on_error {
            Some(f) => f(err),
            None => DefaultObserver.on_error(err),
        }
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// What a recording observer saw, in order
    #[derive(Debug, Clone, PartialEq)]
    pub enum ObservedEvent {
        Log(LogEntry),
        Finish(Value),
        Error(ExecutionError),
    }

    /// Records every callback
    #[derive(Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<ObservedEvent>>,
    }

    impl RecordingObserver {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn events(&self) -> Vec<ObservedEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn logs(&self) -> Vec<LogEntry> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    ObservedEvent::Log(entry) => Some(entry),
                    _ => None,
                })
                .collect()
        }

        pub fn finishes(&self) -> Vec<Value> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    ObservedEvent::Finish(value) => Some(value),
                    _ => None,
                })
                .collect()
        }

        pub fn errors(&self) -> Vec<ExecutionError> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    ObservedEvent::Error(err) => Some(err),
                    _ => None,
                })
                .collect()
        }
    }

    impl ExecutionObserver for RecordingObserver {
        fn on_log(&self, entry: &LogEntry) {
            self.events
                .lock()
                .unwrap()
                .push(ObservedEvent::Log(entry.clone()));
        }

        fn on_finish(&self, return_value: &Value) {
            self.events
                .lock()
                .unwrap()
                .push(ObservedEvent::Finish(return_value.clone()));
        }

        fn on_error(&self, err: &ExecutionError) {
            self.events
                .lock()
                .unwrap()
                .push(ObservedEvent::Error(err.clone()));
        }
    }
}
