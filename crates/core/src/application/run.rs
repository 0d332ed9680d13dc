// Run Coordinator - code string to tracked remote execution

use crate::application::execution::{ExecutionEvents, ExecutionTracker, SettleHook, TrackerRuntime};
use crate::application::language;
use crate::domain::{
    CreateProcessInput, CreateScriptInput, ExecuteOptions, ExecutionSettings, Language,
    ProcessSettings,
};
use crate::error::{AppError, Result};
use crate::port::RemoteService;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of every process created from a code string
pub const PROCESS_SLUG_PREFIX: &str = "yepcode-run-";

/// Options of a single run
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Skip classification and use this language
    pub language: Option<Language>,
    /// Delete the process once the execution settles
    pub remove_on_done: bool,
    /// Explicit dependency manifest for a newly created process
    pub manifest: Option<Value>,
    /// Execution parameters; `{}` when absent
    pub parameters: Option<Value>,
    pub initiated_by: Option<String>,
    pub tag: Option<String>,
    pub comment: Option<String>,
    pub settings: ExecutionSettings,
    pub events: Option<ExecutionEvents>,
}

/// Content-addressed slug: identical code always maps to the same process
pub fn process_slug(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    format!("{}{}", PROCESS_SLUG_PREFIX, hex::encode(digest))
}

/// Turns code strings into tracked executions
///
/// Processes are content-addressed: running the same code twice reuses the
/// remote process created the first time.
#[derive(Clone)]
pub struct RunCoordinator {
    runtime: TrackerRuntime,
}

impl RunCoordinator {
    pub fn new(runtime: TrackerRuntime) -> Self {
        Self { runtime }
    }

    /// Run a code snippet remotely and start tracking it
    pub async fn run(&self, code: &str, options: RunOptions) -> Result<ExecutionTracker> {
        let language = match options.language {
            Some(language) => language,
            None => language::classify(code).ok_or(AppError::Classification)?,
        };
        if code.trim().is_empty() {
            return Err(AppError::Validation("language and code are required".into()));
        }

        let process_id = self
            .ensure_process(code, language, options.manifest)
            .await?;

        let execute_options = ExecuteOptions {
            initiated_by: options.initiated_by,
            tag: options.tag,
            comment: options.comment,
            settings: Some(options.settings).filter(|s| !s.is_empty()),
        };
        let parameters = options.parameters.unwrap_or_else(|| json!({}));
        let execution = self
            .runtime
            .remote
            .execute_async(&process_id, parameters, execute_options)
            .await?;

        info!(
            process_id = %process_id,
            execution_id = %execution.execution_id,
            language = %language,
            remove_on_done = %options.remove_on_done,
            "Execution started"
        );

        let settle = options
            .remove_on_done
            .then(|| self.removal_hook(process_id));
        let observer = options.events.unwrap_or_default().into_observer();

        Ok(ExecutionTracker::start(
            execution.execution_id,
            observer,
            self.runtime.clone(),
            settle,
        ))
    }

    /// Track an existing execution
    pub async fn get_execution(
        &self,
        execution_id: &str,
        events: Option<ExecutionEvents>,
    ) -> Result<ExecutionTracker> {
        if execution_id.is_empty() {
            return Err(AppError::Validation("executionId is required".into()));
        }

        Ok(ExecutionTracker::new(
            execution_id,
            events.unwrap_or_default().into_observer(),
            self.runtime.clone(),
        ))
    }

    /// Id of the process for `code`, creating it on first use
    async fn ensure_process(
        &self,
        code: &str,
        language: Language,
        manifest: Option<Value>,
    ) -> Result<String> {
        let slug = process_slug(code);
        let remote = &self.runtime.remote;

        match remote.get_process(&slug).await {
            Ok(process) => {
                debug!(process_id = %process.id, slug = %slug, "Reusing process");
                return Ok(process.id);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let settings = match manifest {
            Some(_) => None,
            None => Some(ProcessSettings::auto_detected_dependencies()),
        };
        let process = remote
            .create_process(CreateProcessInput {
                name: slug.clone(),
                script: CreateScriptInput {
                    programming_language: language.wire_name().to_string(),
                    source_code: code.to_string(),
                },
                manifest,
                settings,
            })
            .await?;

        info!(process_id = %process.id, slug = %slug, "Process created");
        Ok(process.id)
    }

    fn removal_hook(&self, process_id: String) -> SettleHook {
        let remote = Arc::clone(&self.runtime.remote);
        Box::new(move || -> BoxFuture<'static, ()> {
            Box::pin(async move {
                match remote.delete_process(&process_id).await {
                    Ok(()) => info!(process_id = %process_id, "Process removed"),
                    Err(e) => warn!(
                        process_id = %process_id,
                        error = %e,
                        "Failed to remove process"
                    ),
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Execution, ExecutionRef, ExecutionStatus, Page, Process};
    use crate::port::remote_service::mocks::{ExecutionScript, ScriptedRemote};
    use crate::port::remote_service::MockRemoteService;
    use crate::port::time_provider::mocks::ManualClock;

    fn coordinator(remote: Arc<dyn RemoteService>) -> RunCoordinator {
        let clock = ManualClock::default();
        RunCoordinator::new(
            TrackerRuntime::new(remote).with_clock(Arc::new(clock.clone()), Arc::new(clock)),
        )
    }

    fn finished(id: &str) -> Execution {
        Execution {
            id: id.to_string(),
            process_id: "proc-1".to_string(),
            status: ExecutionStatus::Finished,
            timeline: None,
            parameters: None,
            comment: None,
            return_value: Some("\"done\"".to_string()),
        }
    }

    #[test]
    fn test_process_slug_is_content_addressed() {
        assert_eq!(
            process_slug("hello"),
            "yepcode-run-2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(process_slug("a"), process_slug("a"));
        assert_ne!(process_slug("a"), process_slug("b"));
    }

    #[tokio::test]
    async fn test_unknown_language_is_rejected() {
        let remote = ScriptedRemote::new();
        let err = coordinator(Arc::new(remote.clone()))
            .run("hello", RunOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Classification));
        assert_eq!(remote.created_processes(), 0);
    }

    #[tokio::test]
    async fn test_empty_code_with_language_is_rejected() {
        let remote = ScriptedRemote::new();
        let options = RunOptions {
            language: Some(Language::Python),
            ..RunOptions::default()
        };
        let err = coordinator(Arc::new(remote))
            .run("  ", options)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let mut remote = MockRemoteService::new();
        remote
            .expect_get_process()
            .times(1)
            .returning(|_| Err(AppError::transport(Some(500), "internal")));
        remote.expect_create_process().times(0);
        remote.expect_execute_async().times(0);

        let err = coordinator(Arc::new(remote))
            .run("print('x')", RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_existing_process_is_reused() {
        let code = "console.log('reuse')";
        let slug = process_slug(code);

        let mut remote = MockRemoteService::new();
        let expected_slug = slug.clone();
        remote
            .expect_get_process()
            .withf(move |id| id == expected_slug)
            .returning(|slug| {
                Ok(Process {
                    id: "proc-42".into(),
                    name: slug.to_string(),
                    slug: slug.to_string(),
                })
            });
        remote.expect_create_process().times(0);
        remote
            .expect_execute_async()
            .withf(|id, parameters, options| {
                id == "proc-42" && parameters == &json!({}) && options.settings.is_none()
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(ExecutionRef {
                    execution_id: "exec-1".into(),
                })
            });
        remote
            .expect_get_execution()
            .returning(|id| Ok(finished(id)));
        remote
            .expect_get_execution_logs()
            .returning(|_, _, _| Ok(Page::new(Vec::new(), false)));

        let tracker = coordinator(Arc::new(remote))
            .run(code, RunOptions::default())
            .await
            .unwrap();
        assert_eq!(tracker.execution_id(), "exec-1");

        let snapshot = tracker.wait_for_done().await.unwrap();
        assert_eq!(snapshot.return_value, Some(json!("done")));
    }

    #[tokio::test]
    async fn test_new_process_uses_auto_detected_dependencies() {
        let mut remote = MockRemoteService::new();
        remote
            .expect_get_process()
            .returning(|slug| Err(AppError::NotFound(slug.to_string())));
        remote
            .expect_create_process()
            .withf(|input| {
                input.name.starts_with(PROCESS_SLUG_PREFIX)
                    && input.script.programming_language == "PYTHON"
                    && input.manifest.is_none()
                    && input.settings == Some(ProcessSettings::auto_detected_dependencies())
            })
            .times(1)
            .returning(|input| {
                Ok(Process {
                    id: "proc-7".into(),
                    name: input.name.clone(),
                    slug: input.name,
                })
            });
        remote
            .expect_execute_async()
            .withf(|id, parameters, options| {
                id == "proc-7"
                    && parameters == &json!({"n": 1})
                    && options.tag.as_deref() == Some("v1")
                    && options
                        .settings
                        .as_ref()
                        .and_then(|s| s.timeout)
                        == Some(5_000)
            })
            .returning(|_, _, _| {
                Ok(ExecutionRef {
                    execution_id: "exec-7".into(),
                })
            });
        remote
            .expect_get_execution()
            .returning(|id| Ok(finished(id)));
        remote
            .expect_get_execution_logs()
            .returning(|_, _, _| Ok(Page::new(Vec::new(), false)));

        let options = RunOptions {
            parameters: Some(json!({"n": 1})),
            tag: Some("v1".into()),
            settings: ExecutionSettings {
                timeout: Some(5_000),
                ..ExecutionSettings::default()
            },
            ..RunOptions::default()
        };
        let tracker = coordinator(Arc::new(remote))
            .run("def main():\n    print('hi')", options)
            .await
            .unwrap();
        tracker.wait_for_done().await.unwrap();
    }

    #[tokio::test]
    async fn test_manifest_replaces_default_settings() {
        let mut remote = MockRemoteService::new();
        remote
            .expect_get_process()
            .returning(|slug| Err(AppError::NotFound(slug.to_string())));
        remote
            .expect_create_process()
            .withf(|input| {
                input.manifest == Some(json!({"dependencies": {"lodash": "4"}}))
                    && input.settings.is_none()
                    && input.script.programming_language == "JAVASCRIPT"
            })
            .times(1)
            .returning(|input| {
                Ok(Process {
                    id: "proc-8".into(),
                    name: input.name.clone(),
                    slug: input.name,
                })
            });
        remote.expect_execute_async().returning(|_, _, _| {
            Ok(ExecutionRef {
                execution_id: "exec-8".into(),
            })
        });
        remote
            .expect_get_execution()
            .returning(|id| Ok(finished(id)));
        remote
            .expect_get_execution_logs()
            .returning(|_, _, _| Ok(Page::new(Vec::new(), false)));

        let options = RunOptions {
            language: Some(Language::JavaScript),
            manifest: Some(json!({"dependencies": {"lodash": "4"}})),
            ..RunOptions::default()
        };
        let tracker = coordinator(Arc::new(remote))
            .run("module.exports = 1", options)
            .await
            .unwrap();
        tracker.wait_for_done().await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_on_done_deletes_process_before_release() {
        let remote = ScriptedRemote::new()
            .with_default_script(ExecutionScript::finished("1").running_for(2));
        let code = "const a = 1;\nconsole.log(a);";
        let options = RunOptions {
            remove_on_done: true,
            ..RunOptions::default()
        };

        let tracker = coordinator(Arc::new(remote.clone()))
            .run(code, options)
            .await
            .unwrap();
        tracker.wait_for_done().await.unwrap();

        assert_eq!(remote.deleted_processes().len(), 1);
        assert!(remote.process_by_slug(&process_slug(code)).is_none());
    }

    #[tokio::test]
    async fn test_remove_on_done_survives_dropped_tracker() {
        let remote = ScriptedRemote::new()
            .with_default_script(ExecutionScript::finished("1").running_for(3));
        let options = RunOptions {
            language: Some(Language::Python),
            remove_on_done: true,
            ..RunOptions::default()
        };

        let tracker = coordinator(Arc::new(remote.clone()))
            .run("print('x')", options)
            .await
            .unwrap();
        drop(tracker);

        for _ in 0..200 {
            if !remote.deleted_processes().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(remote.get_execution_calls(), 4);
        assert_eq!(remote.deleted_processes().len(), 1);
        assert!(remote.process_by_slug(&process_slug("print('x')")).is_none());
    }

    #[tokio::test]
    async fn test_failed_removal_does_not_fail_execution() {
        let mut remote = MockRemoteService::new();
        remote.expect_get_process().returning(|slug| {
            Ok(Process {
                id: "proc-9".into(),
                name: slug.to_string(),
                slug: slug.to_string(),
            })
        });
        remote.expect_execute_async().returning(|_, _, _| {
            Ok(ExecutionRef {
                execution_id: "exec-9".into(),
            })
        });
        remote
            .expect_get_execution()
            .returning(|id| Ok(finished(id)));
        remote
            .expect_get_execution_logs()
            .returning(|_, _, _| Ok(Page::new(Vec::new(), false)));
        remote
            .expect_delete_process()
            .withf(|id| id == "proc-9")
            .times(1)
            .returning(|_| Err(AppError::transport(Some(500), "nope")));

        let options = RunOptions {
            language: Some(Language::JavaScript),
            remove_on_done: true,
            ..RunOptions::default()
        };
        let tracker = coordinator(Arc::new(remote))
            .run("let x = 1", options)
            .await
            .unwrap();
        let snapshot = tracker.wait_for_done().await.unwrap();
        assert_eq!(snapshot.status, Some(ExecutionStatus::Finished));
    }

    #[tokio::test]
    async fn test_get_execution_requires_id() {
        let remote = ScriptedRemote::new();
        let err = coordinator(Arc::new(remote))
            .get_execution("", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: executionId is required");
    }
}
