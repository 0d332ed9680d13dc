//! Code execution facade

use crate::context::SdkContext;
use std::sync::Arc;
use yepcode_core::application::{
    ExecutionEvents, ExecutionTracker, RunCoordinator, RunOptions, TrackerRuntime,
};
use yepcode_core::port::RemoteService;
use yepcode_core::Result;
use yepcode_infra_http::{ApiConfig, YepCodeApi};

/// Run code snippets on the platform and track their executions
///
/// # Example
///
/// ```no_run
/// use yepcode_sdk::{ApiConfig, RunOptions, YepCodeRun};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let runner = YepCodeRun::new(ApiConfig::default())?;
/// let execution = runner
///     .run("async function main() { return { ok: true } }", RunOptions::default())
///     .await?;
/// let done = execution.wait_for_done().await?;
/// println!("{:?}", done.return_value);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct YepCodeRun {
    coordinator: RunCoordinator,
    client_id: Option<String>,
}

impl YepCodeRun {
    /// Facade over the shared client for `config` (merged with `YEPCODE_*`)
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::with_context(SdkContext::global(), config)
    }

    pub fn with_context(context: &SdkContext, config: ApiConfig) -> Result<Self> {
        Ok(Self::from_api(context.api(config)?))
    }

    pub fn from_api(api: Arc<YepCodeApi>) -> Self {
        let client_id = api.client_id().map(str::to_string);
        let remote: Arc<dyn RemoteService> = api;
        Self {
            coordinator: RunCoordinator::new(TrackerRuntime::new(remote)),
            client_id,
        }
    }

    /// Facade over any platform implementation and clock
    pub fn from_runtime(runtime: TrackerRuntime) -> Self {
        Self {
            coordinator: RunCoordinator::new(runtime),
            client_id: None,
        }
    }

    pub async fn run(&self, code: &str, options: RunOptions) -> Result<ExecutionTracker> {
        self.coordinator.run(code, options).await
    }

    pub async fn get_execution(
        &self,
        execution_id: &str,
        events: Option<ExecutionEvents>,
    ) -> Result<ExecutionTracker> {
        self.coordinator.get_execution(execution_id, events).await
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yepcode_core::domain::ExecutionStatus;
    use yepcode_core::port::remote_service::mocks::{ExecutionScript, ScriptedRemote};
    use yepcode_core::port::time_provider::mocks::ManualClock;
    use yepcode_core::AppError;

    fn runner(remote: &ScriptedRemote) -> YepCodeRun {
        let clock = ManualClock::default();
        let remote: Arc<dyn RemoteService> = Arc::new(remote.clone());
        YepCodeRun::from_runtime(
            TrackerRuntime::new(remote).with_clock(Arc::new(clock.clone()), Arc::new(clock)),
        )
    }

    #[tokio::test]
    async fn test_run_and_wait() {
        let remote = ScriptedRemote::new()
            .with_default_script(ExecutionScript::finished(r#"{"answer":42}"#).running_for(2));
        let runner = runner(&remote);

        let execution = runner
            .run("print('hello')", RunOptions::default())
            .await
            .unwrap();
        let done = execution.wait_for_done().await.unwrap();

        assert_eq!(done.status, Some(ExecutionStatus::Finished));
        assert_eq!(done.return_value, Some(json!({"answer": 42})));
        assert_eq!(runner.client_id(), None);
    }

    #[tokio::test]
    async fn test_get_execution_requires_id() {
        let runner = runner(&ScriptedRemote::new());

        let err = runner.get_execution("", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_client_id_comes_from_credentials() {
        let api = YepCodeApi::from_config(&ApiConfig {
            client_id: Some("sa-acme-1a2b3c4d".to_string()),
            client_secret: Some("secret".to_string()),
            ..ApiConfig::default()
        })
        .unwrap();

        let runner = YepCodeRun::from_api(Arc::new(api));
        assert_eq!(runner.client_id(), Some("sa-acme-1a2b3c4d"));
    }
}
