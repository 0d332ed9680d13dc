// Execution tracking - polling state machine, observers and completion

mod backoff;
mod completion;
pub mod constants;
pub mod observer;
mod panic_guard;
mod tracker;

pub use backoff::{PollDecision, PollPolicy};
pub use completion::{PollFailure, PollFailureKind};
pub use observer::{DefaultObserver, ExecutionEvents, ExecutionObserver};
pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use tracker::{ExecutionTracker, PollPhase, SettleHook, TrackerConfig, TrackerRuntime};
