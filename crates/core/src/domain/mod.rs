// Domain Layer - Entities and wire models of the platform

pub mod execution;
pub mod language;
pub mod page;
pub mod process;
pub mod variable;

// Re-exports
pub use execution::{
    Execution, ExecutionError, ExecutionId, ExecutionRef, ExecutionSettings, ExecutionSnapshot,
    ExecutionStatus, ExecutionTimeline, ExecuteOptions, LogEntry, TimelineEvent,
};
pub use language::Language;
pub use page::{Page, DEFAULT_PAGE_LIMIT};
pub use process::{CreateProcessInput, CreateScriptInput, DependenciesConfig, Process, ProcessSettings};
pub use variable::{CreateVariableInput, EnvVar, TeamVariable, UpdateVariableInput};
