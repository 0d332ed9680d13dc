// Panic isolation for observer callbacks
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Result of a panic-guarded call
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Call completed
    Success(T),
    /// Call panicked
    Panicked(String),
}

/// Run a user callback with panic isolation
///
/// A panicking observer must not take the polling task down with it: the
/// panic is caught, logged with the callback name and returned as
/// `PanicGuardResult::Panicked`.
pub fn execute_guarded<F, T>(execution_id: &str, callback: &str, f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            error!(
                execution_id = %execution_id,
                callback = %callback,
                panic_msg = %panic_msg,
                "Execution observer panicked"
            );
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_value_through() {
        match execute_guarded("e", "on_log", || 42) {
            PanicGuardResult::Success(v) => assert_eq!(v, 42),
            PanicGuardResult::Panicked(msg) => panic!("unexpected panic: {}", msg),
        }
    }

    #[test]
    fn test_panic_is_caught() {
        let result: PanicGuardResult<()> = execute_guarded("e", "on_finish", || panic!("boom"));
        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "boom"),
            PanicGuardResult::Success(_) => panic!("panic was not caught"),
        }

        let formatted: PanicGuardResult<()> =
            execute_guarded("e", "on_error", || panic!("code {}", 7));
        match formatted {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "code 7"),
            PanicGuardResult::Success(_) => panic!("panic was not caught"),
        }
    }
}
