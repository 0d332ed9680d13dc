// Remote Service Port (Interface)
// Authenticated process/execution operations against the platform

use crate::domain::{
    CreateProcessInput, ExecuteOptions, Execution, ExecutionRef, LogEntry, Page, Process,
};
use crate::error::Result;
use async_trait::async_trait;

/// Process and execution operations of the platform
///
/// Implementations:
/// - `YepCodeApi` (yepcode-infra-http): REST over reqwest
/// - `mocks::ScriptedRemote`: in-memory platform for tests
///
/// Every "not there" answer must surface as `AppError::NotFound`; callers
/// rely on it to tell a missing resource apart from a transport failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Get a process by id or slug
    async fn get_process(&self, id_or_slug: &str) -> Result<Process>;

    /// Create a new process
    async fn create_process(&self, input: CreateProcessInput) -> Result<Process>;

    /// Delete a process by id or slug
    async fn delete_process(&self, id_or_slug: &str) -> Result<()>;

    /// Trigger an asynchronous execution and return its id
    async fn execute_async(
        &self,
        id_or_slug: &str,
        parameters: serde_json::Value,
        options: ExecuteOptions,
    ) -> Result<ExecutionRef>;

    /// Current status and metadata of an execution
    async fn get_execution(&self, execution_id: &str) -> Result<Execution>;

    /// One page of an execution's logs
    async fn get_execution_logs(
        &self,
        execution_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<LogEntry>>;

    /// Request termination of a running execution
    async fn kill_execution(&self, execution_id: &str) -> Result<()>;

    /// Start a fresh execution cloned from an existing one
    async fn rerun_execution(&self, execution_id: &str) -> Result<ExecutionRef>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{ExecutionStatus, ExecutionTimeline, TimelineEvent};
    use crate::error::AppError;
    use chrono::{Duration, SecondsFormat, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// How a scripted execution ends
    #[derive(Debug, Clone)]
    pub enum ScriptedOutcome {
        /// FINISHED with an optional raw return value
        Finished { return_value: Option<String> },
        /// Failed terminal state with an optional timeline explanation
        Failed {
            status: ExecutionStatus,
            explanation: Option<String>,
        },
    }

    /// Behaviour of one execution on the in-memory platform
    #[derive(Debug, Clone)]
    pub struct ExecutionScript {
        /// Number of `get_execution` calls answered with RUNNING before the outcome
        pub running_polls: usize,
        /// (level, message) pairs; one more becomes visible on every poll
        pub logs: Vec<(String, String)>,
        pub outcome: ScriptedOutcome,
    }

    impl ExecutionScript {
        pub fn finished(return_value: impl Into<String>) -> Self {
            Self {
                running_polls: 0,
                logs: Vec::new(),
                outcome: ScriptedOutcome::Finished {
                    return_value: Some(return_value.into()),
                },
            }
        }

        pub fn failed(status: ExecutionStatus, explanation: Option<&str>) -> Self {
            Self {
                running_polls: 0,
                logs: Vec::new(),
                outcome: ScriptedOutcome::Failed {
                    status,
                    explanation: explanation.map(str::to_string),
                },
            }
        }

        pub fn running_for(mut self, polls: usize) -> Self {
            self.running_polls = polls;
            self
        }

        pub fn with_log(mut self, level: &str, message: &str) -> Self {
            self.logs.push((level.to_string(), message.to_string()));
            self
        }
    }

    impl Default for ExecutionScript {
        fn default() -> Self {
            Self {
                running_polls: 0,
                logs: Vec::new(),
                outcome: ScriptedOutcome::Finished { return_value: None },
            }
        }
    }

    struct ScriptedExecution {
        process_id: String,
        parameters: serde_json::Value,
        comment: Option<String>,
        script: ExecutionScript,
        polls: usize,
        /// Materialized log lines (timestamp assigned when they become visible)
        visible_logs: Vec<LogEntry>,
        timeline: Vec<TimelineEvent>,
        status: ExecutionStatus,
    }

    #[derive(Default)]
    struct PlatformState {
        processes: HashMap<String, Process>,
        executions: HashMap<String, ScriptedExecution>,
        scripts: Vec<(String, ExecutionScript)>,
        process_scripts: HashMap<String, ExecutionScript>,
        default_script: ExecutionScript,
        pending_failures: usize,
        next_id: u64,
        clock_ticks: i64,
        created_processes: usize,
        deleted_processes: Vec<String>,
        execute_calls: Vec<(String, serde_json::Value, ExecuteOptions)>,
        get_execution_calls: usize,
        log_page_calls: usize,
    }

    impl PlatformState {
        fn next_id(&mut self, prefix: &str) -> String {
            self.next_id += 1;
            format!("{}-{}", prefix, self.next_id)
        }

        fn next_timestamp(&mut self) -> String {
            self.clock_ticks += 1;
            let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
            (base + Duration::seconds(self.clock_ticks)).to_rfc3339_opts(SecondsFormat::Secs, true)
        }

        fn script_for(&self, source: &str) -> ExecutionScript {
            self.scripts
                .iter()
                .find(|(needle, _)| source.contains(needle.as_str()))
                .map(|(_, script)| script.clone())
                .unwrap_or_else(|| self.default_script.clone())
        }

        fn start_execution(
            &mut self,
            process_id: String,
            script: ExecutionScript,
            parameters: serde_json::Value,
            comment: Option<String>,
        ) -> String {
            let id = self.next_id("exec");
            let timestamp = self.next_timestamp();
            self.executions.insert(
                id.clone(),
                ScriptedExecution {
                    process_id,
                    parameters,
                    comment,
                    script,
                    polls: 0,
                    visible_logs: Vec::new(),
                    timeline: vec![TimelineEvent {
                        status: ExecutionStatus::Created,
                        timestamp,
                        explanation: None,
                    }],
                    status: ExecutionStatus::Created,
                },
            );
            id
        }

        fn reveal_log(&mut self, execution_id: &str) {
            let timestamp = self.next_timestamp();
            if let Some(execution) = self.executions.get_mut(execution_id) {
                let shown = execution.visible_logs.len();
                if let Some((level, message)) = execution.script.logs.get(shown) {
                    execution
                        .visible_logs
                        .push(LogEntry::new(timestamp, level.clone(), message.clone()));
                }
            }
        }

        fn advance(&mut self, execution_id: &str) -> Result<Execution> {
            let (polls, running_polls, status) = {
                let execution = self
                    .executions
                    .get_mut(execution_id)
                    .ok_or_else(|| AppError::NotFound(format!("execution {}", execution_id)))?;
                execution.polls += 1;
                (
                    execution.polls,
                    execution.script.running_polls,
                    execution.status,
                )
            };

            if !status.is_terminal() {
                self.reveal_log(execution_id);
                if polls > running_polls {
                    let total = self.executions[execution_id].script.logs.len();
                    while self.executions[execution_id].visible_logs.len() < total {
                        self.reveal_log(execution_id);
                    }
                    self.settle(execution_id);
                } else if status == ExecutionStatus::Created {
                    let timestamp = self.next_timestamp();
                    if let Some(execution) = self.executions.get_mut(execution_id) {
                        execution.status = ExecutionStatus::Running;
                        execution.timeline.push(TimelineEvent {
                            status: ExecutionStatus::Running,
                            timestamp,
                            explanation: None,
                        });
                    }
                }
            }

            Ok(self.view(execution_id))
        }

        fn settle(&mut self, execution_id: &str) {
            let timestamp = self.next_timestamp();
            if let Some(execution) = self.executions.get_mut(execution_id) {
                let (status, explanation) = match &execution.script.outcome {
                    ScriptedOutcome::Finished { .. } => (ExecutionStatus::Finished, None),
                    ScriptedOutcome::Failed {
                        status,
                        explanation,
                    } => (*status, explanation.clone()),
                };
                execution.status = status;
                execution.timeline.push(TimelineEvent {
                    status,
                    timestamp,
                    explanation,
                });
            }
        }

        fn view(&self, execution_id: &str) -> Execution {
            let execution = &self.executions[execution_id];
            let return_value = match (&execution.script.outcome, execution.status) {
                (ScriptedOutcome::Finished { return_value }, ExecutionStatus::Finished) => {
                    return_value.clone()
                }
                _ => None,
            };
            Execution {
                id: execution_id.to_string(),
                process_id: execution.process_id.clone(),
                status: execution.status,
                timeline: Some(ExecutionTimeline {
                    explanation: None,
                    events: execution.timeline.clone(),
                }),
                parameters: Some(execution.parameters.clone()),
                comment: execution.comment.clone(),
                return_value,
            }
        }
    }

    /// In-memory platform: processes, scripted executions and call counters
    #[derive(Clone, Default)]
    pub struct ScriptedRemote {
        state: Arc<Mutex<PlatformState>>,
    }

    impl ScriptedRemote {
        pub fn new() -> Self {
            Self::default()
        }

        /// Executions of processes whose source contains `needle` follow `script`
        pub fn with_script(self, needle: &str, script: ExecutionScript) -> Self {
            self.state
                .lock()
                .unwrap()
                .scripts
                .push((needle.to_string(), script));
            self
        }

        /// Script used when no registered needle matches
        pub fn with_default_script(self, script: ExecutionScript) -> Self {
            self.state.lock().unwrap().default_script = script;
            self
        }

        /// Register an execution directly, without a process behind it
        pub fn seed_execution(&self, script: ExecutionScript) -> String {
            self.state.lock().unwrap().start_execution(
                "seeded-process".to_string(),
                script,
                serde_json::json!({}),
                None,
            )
        }

        /// The next `count` calls to `get_execution` fail with a transport error
        pub fn fail_next_polls(&self, count: usize) {
            self.state.lock().unwrap().pending_failures = count;
        }

        pub fn process_by_slug(&self, slug: &str) -> Option<Process> {
            self.state
                .lock()
                .unwrap()
                .processes
                .values()
                .find(|p| p.slug == slug)
                .cloned()
        }

        pub fn created_processes(&self) -> usize {
            self.state.lock().unwrap().created_processes
        }

        pub fn deleted_processes(&self) -> Vec<String> {
            self.state.lock().unwrap().deleted_processes.clone()
        }

        pub fn execute_calls(&self) -> Vec<(String, serde_json::Value, ExecuteOptions)> {
            self.state.lock().unwrap().execute_calls.clone()
        }

        pub fn get_execution_calls(&self) -> usize {
            self.state.lock().unwrap().get_execution_calls
        }

        pub fn log_page_calls(&self) -> usize {
            self.state.lock().unwrap().log_page_calls
        }
    }

    #[async_trait]
    impl RemoteService for ScriptedRemote {
        async fn get_process(&self, id_or_slug: &str) -> Result<Process> {
            let state = self.state.lock().unwrap();
            state
                .processes
                .values()
                .find(|p| p.id == id_or_slug || p.slug == id_or_slug)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("process {}", id_or_slug)))
        }

        async fn create_process(&self, input: CreateProcessInput) -> Result<Process> {
            let mut state = self.state.lock().unwrap();
            if state.processes.values().any(|p| p.slug == input.name) {
                return Err(AppError::transport(
                    Some(409),
                    format!("process {} already exists", input.name),
                ));
            }
            let id = state.next_id("proc");
            let process = Process {
                id: id.clone(),
                name: input.name.clone(),
                slug: input.name,
            };
            state.created_processes += 1;
            let script = state.script_for(&input.script.source_code);
            state.process_scripts.insert(id.clone(), script);
            state.processes.insert(id, process.clone());
            Ok(process)
        }

        async fn delete_process(&self, id_or_slug: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let id = state
                .processes
                .values()
                .find(|p| p.id == id_or_slug || p.slug == id_or_slug)
                .map(|p| p.id.clone())
                .ok_or_else(|| AppError::NotFound(format!("process {}", id_or_slug)))?;
            state.processes.remove(&id);
            state.deleted_processes.push(id);
            Ok(())
        }

        async fn execute_async(
            &self,
            id_or_slug: &str,
            parameters: serde_json::Value,
            options: ExecuteOptions,
        ) -> Result<ExecutionRef> {
            let mut state = self.state.lock().unwrap();
            let process_id = state
                .processes
                .values()
                .find(|p| p.id == id_or_slug || p.slug == id_or_slug)
                .map(|p| p.id.clone())
                .ok_or_else(|| AppError::NotFound(format!("process {}", id_or_slug)))?;
            let script = state
                .process_scripts
                .get(&process_id)
                .cloned()
                .unwrap_or_else(|| state.default_script.clone());
            state
                .execute_calls
                .push((process_id.clone(), parameters.clone(), options.clone()));
            let execution_id =
                state.start_execution(process_id, script, parameters, options.comment);
            Ok(ExecutionRef { execution_id })
        }

        async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
            let mut state = self.state.lock().unwrap();
            state.get_execution_calls += 1;
            if state.pending_failures > 0 {
                state.pending_failures -= 1;
                return Err(AppError::transport(Some(503), "service unavailable"));
            }
            state.advance(execution_id)
        }

        async fn get_execution_logs(
            &self,
            execution_id: &str,
            page: u32,
            limit: u32,
        ) -> Result<Page<LogEntry>> {
            let mut state = self.state.lock().unwrap();
            state.log_page_calls += 1;
            let execution = state
                .executions
                .get(execution_id)
                .ok_or_else(|| AppError::NotFound(format!("execution {}", execution_id)))?;
            // Newest first, like the platform; the tracker must sort
            let mut all = execution.visible_logs.clone();
            all.reverse();
            let start = (page * limit) as usize;
            let data: Vec<_> = all.iter().skip(start).take(limit as usize).cloned().collect();
            let has_next_page = start + data.len() < all.len();
            Ok(Page::new(data, has_next_page))
        }

        async fn kill_execution(&self, execution_id: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let timestamp = state.next_timestamp();
            let execution = state
                .executions
                .get_mut(execution_id)
                .ok_or_else(|| AppError::NotFound(format!("execution {}", execution_id)))?;
            if !execution.status.is_terminal() {
                execution.status = ExecutionStatus::Killed;
                execution.timeline.push(TimelineEvent {
                    status: ExecutionStatus::Killed,
                    timestamp,
                    explanation: Some("Execution killed by user".to_string()),
                });
            }
            Ok(())
        }

        async fn rerun_execution(&self, execution_id: &str) -> Result<ExecutionRef> {
            let mut state = self.state.lock().unwrap();
            let (process_id, script, parameters, comment) = {
                let execution = state
                    .executions
                    .get(execution_id)
                    .ok_or_else(|| AppError::NotFound(format!("execution {}", execution_id)))?;
                (
                    execution.process_id.clone(),
                    execution.script.clone(),
                    execution.parameters.clone(),
                    execution.comment.clone(),
                )
            };
            let execution_id = state.start_execution(process_id, script, parameters, comment);
            Ok(ExecutionRef { execution_id })
        }
    }
}
