// Application Layer - Use Cases and Business Logic

pub mod env;
pub mod execution;
pub mod language;
pub mod pagination;
pub mod run;

// Re-exports
pub use env::EnvService;
pub use execution::{
    DefaultObserver, ExecutionEvents, ExecutionObserver, ExecutionTracker, PollPhase,
    TrackerConfig, TrackerRuntime,
};
pub use language::{classify, LanguageScores};
pub use run::{process_slug, RunCoordinator, RunOptions};
