// Port Layer - Interfaces for external dependencies

pub mod remote_service;
pub mod team_variables;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use remote_service::RemoteService;
pub use team_variables::TeamVariables;
pub use time_provider::{Scheduler, SystemTimeProvider, TimeProvider, TokioScheduler};
