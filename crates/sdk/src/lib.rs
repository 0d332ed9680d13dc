//! YepCode Run SDK
//!
//! Runs JavaScript or Python snippets on the YepCode platform and tracks
//! the resulting executions: status, logs, return value and errors.
//!
//! # Example
//!
//! ```no_run
//! use yepcode_sdk::{ApiConfig, ExecutionEvents, RunOptions, YepCodeRun};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from YEPCODE_* variables or .env
//!     let runner = YepCodeRun::new(ApiConfig::default())?;
//!
//!     let execution = runner
//!         .run(
//!             "print('hello from python')",
//!             RunOptions {
//!                 remove_on_done: true,
//!                 events: Some(ExecutionEvents::new().on_log(|log| println!("{}", log.message))),
//!                 ..RunOptions::default()
//!             },
//!         )
//!         .await?;
//!
//!     let done = execution.wait_for_done().await?;
//!     println!("Finished with {:?}", done.status);
//!
//!     Ok(())
//! }
//! ```

mod context;
mod env;
mod run;

pub use context::SdkContext;
pub use env::YepCodeEnv;
pub use run::YepCodeRun;

pub use yepcode_core::application::{
    classify, ExecutionEvents, ExecutionObserver, ExecutionTracker, PollPhase, RunOptions,
};
pub use yepcode_core::domain::{
    EnvVar, ExecutionError, ExecutionSettings, ExecutionSnapshot, ExecutionStatus, Language,
    LogEntry,
};
pub use yepcode_core::{AppError, Result};
pub use yepcode_infra_http::ApiConfig;
